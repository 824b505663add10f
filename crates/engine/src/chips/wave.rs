//! 2-voice wavetable backend with a small wave RAM

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::chips::note_freq;
use crate::dispatch::{ChipDispatch, RegisterWrite};

use cmdstream::{Command, CommandKind, NOTE_NULL};

const N_VOICES: usize = 2;
const WAVE_LEN: usize = 32;
const RAM_SIZE: usize = N_VOICES * WAVE_LEN;

/// Built-in waveforms selectable with the wavetable command.
fn waveform(index: usize, step: usize) -> u8 {
    match index & 3 {
        // square
        0 => {
            if step < WAVE_LEN / 2 {
                15
            } else {
                0
            }
        }
        // saw
        1 => (step / 2) as u8,
        // triangle
        2 => {
            if step < WAVE_LEN / 2 {
                (step * 30 / WAVE_LEN) as u8
            } else {
                (30 - step * 30 / WAVE_LEN) as u8
            }
        }
        // 25% pulse
        _ => {
            if step < WAVE_LEN / 4 {
                15
            } else {
                0
            }
        }
    }
}

#[derive(Default, Clone)]
struct Voice {
    note: i32,
    volume: u8,
    active: bool,
    loaded: bool,
    phase: f64,
}

pub struct WaveChip {
    ram: [u8; RAM_SIZE],
    voices: [Voice; N_VOICES],
    rate: u32,
    dump: bool,
    writes: Vec<RegisterWrite>,
}

impl WaveChip {
    pub fn new() -> Self {
        Self {
            ram: [0; RAM_SIZE],
            voices: Default::default(),
            rate: 44100,
            dump: false,
            writes: Vec::new(),
        }
    }

    fn load_wave(&mut self, voice: usize, index: usize) {
        for step in 0..WAVE_LEN {
            let addr = voice * WAVE_LEN + step;
            let value = waveform(index, step);
            self.ram[addr] = value;
            if self.dump {
                self.writes.push(RegisterWrite {
                    addr: addr as u32,
                    value: value.into(),
                });
            }
        }
        self.voices[voice].loaded = true;
    }
}

impl Default for WaveChip {
    fn default() -> Self {
        Self::new()
    }
}

impl ChipDispatch for WaveChip {
    fn dispatch(&mut self, cmd: &Command) -> i32 {
        let voice = cmd.chan;
        if voice >= N_VOICES {
            return 0;
        }

        match cmd.kind {
            CommandKind::NoteOn => {
                if cmd.value != NOTE_NULL {
                    self.voices[voice].note = cmd.value;
                }
                if !self.voices[voice].loaded {
                    self.load_wave(voice, 0);
                }
                self.voices[voice].active = true;
                self.voices[voice].volume = 127;
                1
            }
            CommandKind::Legato => {
                self.voices[voice].note = cmd.value;
                1
            }
            CommandKind::NoteOff | CommandKind::NoteOffEnv | CommandKind::EnvRelease => {
                self.voices[voice].active = false;
                1
            }
            CommandKind::Volume | CommandKind::HintVolume => {
                self.voices[voice].volume = cmd.value.clamp(0, 127) as u8;
                1
            }
            CommandKind::WaveTable => {
                self.load_wave(voice, cmd.value.clamp(0, 3) as usize);
                1
            }
            _ => 0,
        }
    }

    fn tick(&mut self, _system_tick: bool) {}

    fn acquire(&mut self, buffers: &mut [&mut [i16]], frames: usize) {
        for (voice, buf) in buffers.iter_mut().enumerate().take(N_VOICES) {
            let v = &mut self.voices[voice];
            if !v.active {
                buf[..frames].fill(0);
                continue;
            }

            let step = note_freq(v.note) * WAVE_LEN as f64 / f64::from(self.rate);
            let amp = i32::from(v.volume >> 3);
            for s in buf.iter_mut().take(frames) {
                let sample = i32::from(self.ram[voice * WAVE_LEN + (v.phase as usize % WAVE_LEN)]);
                *s = (((sample - 8) * amp) << 6) as i16;
                v.phase += step;
                if v.phase >= WAVE_LEN as f64 {
                    v.phase -= WAVE_LEN as f64;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.ram = [0; RAM_SIZE];
        self.voices = Default::default();
        self.writes.clear();
    }

    fn init(&mut self, suggested_rate: u32) -> usize {
        self.rate = suggested_rate.max(1);
        self.reset();
        N_VOICES
    }

    fn channel_count(&self) -> usize {
        N_VOICES
    }

    fn sample_mem(&self) -> &[u8] {
        &self.ram
    }

    fn sample_mem_usage(&self) -> usize {
        self.voices.iter().filter(|v| v.loaded).count() * WAVE_LEN
    }

    fn sample_mem_capacity(&self) -> usize {
        RAM_SIZE
    }

    fn is_sample_loaded(&self, index: usize) -> bool {
        self.voices.get(index).is_some_and(|v| v.loaded)
    }

    fn set_register_dump(&mut self, enabled: bool) {
        self.dump = enabled;
        if !enabled {
            self.writes.clear();
        }
    }

    fn drain_register_writes(&mut self) -> Vec<RegisterWrite> {
        std::mem::take(&mut self.writes)
    }
}
