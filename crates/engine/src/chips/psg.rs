//! 4-voice PSG backend: three squares and one noise voice

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::chips::note_freq;
use crate::dispatch::{ChipDispatch, ChipFlags, RegisterWrite};

use cmdstream::{Command, CommandKind, NOTE_NULL};

const CLOCK: u32 = 1_789_772;
const N_VOICES: usize = 4;
const NOISE_VOICE: usize = 3;

// register map: 0/2/4 period low, 1/3/5 period high, 6 noise period,
// 7 noise mode, 8-11 volumes
const REG_NOISE_PERIOD: usize = 6;
const REG_NOISE_MODE: usize = 7;
const REG_VOLUME_BASE: usize = 8;

#[derive(Default, Clone)]
struct Voice {
    note: i32,
    volume: u8,
    releasing: bool,
    phase: u32,
    level: bool,
}

pub struct PsgChip {
    regs: [u8; 16],
    voices: [Voice; N_VOICES],
    lfsr: u32,
    short_lfsr: bool,
    rate: u32,
    dump: bool,
    writes: Vec<RegisterWrite>,
    osc: Vec<Vec<i16>>,
}

impl PsgChip {
    pub fn new() -> Self {
        Self {
            regs: [0; 16],
            voices: Default::default(),
            lfsr: 1,
            short_lfsr: false,
            rate: 44100,
            dump: false,
            writes: Vec::new(),
            osc: vec![Vec::new(); N_VOICES],
        }
    }

    fn write_reg(&mut self, addr: usize, value: u8) {
        self.regs[addr] = value;
        if self.dump {
            self.writes.push(RegisterWrite {
                addr: addr as u32,
                value: value.into(),
            });
        }
    }

    fn period_for(&self, voice: usize) -> u32 {
        let note = self.voices[voice].note;
        let p = (f64::from(CLOCK) / (16.0 * note_freq(note))) as u32;
        p.clamp(1, 0xfff)
    }

    fn update_period(&mut self, voice: usize) {
        if voice == NOISE_VOICE {
            let p = (self.period_for(voice) >> 4).min(0x1f) as u8;
            self.write_reg(REG_NOISE_PERIOD, p);
        } else {
            let p = self.period_for(voice);
            self.write_reg(voice * 2, (p & 0xff) as u8);
            self.write_reg(voice * 2 + 1, (p >> 8) as u8);
        }
    }

    fn update_volume(&mut self, voice: usize) {
        let v = self.voices[voice].volume >> 3;
        self.write_reg(REG_VOLUME_BASE + voice, v);
    }
}

impl Default for PsgChip {
    fn default() -> Self {
        Self::new()
    }
}

impl ChipDispatch for PsgChip {
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
                self.voices[voice].releasing = false;
                self.voices[voice].volume = 127;
                self.update_period(voice);
                self.update_volume(voice);
                1
            }
            CommandKind::Legato => {
                self.voices[voice].note = cmd.value;
                self.update_period(voice);
                1
            }
            CommandKind::NoteOff => {
                self.voices[voice].volume = 0;
                self.update_volume(voice);
                1
            }
            CommandKind::NoteOffEnv | CommandKind::EnvRelease => {
                self.voices[voice].releasing = true;
                1
            }
            CommandKind::Volume | CommandKind::HintVolume => {
                self.voices[voice].volume = cmd.value.clamp(0, 127) as u8;
                self.update_volume(voice);
                1
            }
            CommandKind::Pitch => {
                // detune rides on top of the note period
                let p = self
                    .period_for(voice)
                    .saturating_add_signed(-cmd.value)
                    .clamp(1, 0xfff);
                if voice != NOISE_VOICE {
                    self.write_reg(voice * 2, (p & 0xff) as u8);
                    self.write_reg(voice * 2 + 1, (p >> 8) as u8);
                }
                1
            }
            CommandKind::StdNoiseFreq => {
                self.write_reg(REG_NOISE_PERIOD, (cmd.value & 0x1f) as u8);
                1
            }
            CommandKind::StdNoiseMode => {
                self.short_lfsr = cmd.value != 0;
                self.write_reg(REG_NOISE_MODE, (cmd.value & 1) as u8);
                1
            }
            _ => 0,
        }
    }

    fn tick(&mut self, _system_tick: bool) {
        for voice in 0..N_VOICES {
            if self.voices[voice].releasing && self.voices[voice].volume > 0 {
                self.voices[voice].volume = self.voices[voice].volume.saturating_sub(16);
                self.update_volume(voice);
            }
        }
    }

    fn acquire(&mut self, buffers: &mut [&mut [i16]], frames: usize) {
        for (voice, buf) in buffers.iter_mut().enumerate().take(N_VOICES) {
            let vol = u32::from(self.regs[REG_VOLUME_BASE + voice] & 0x0f);
            let amp = (vol * 546) as i16;

            if voice == NOISE_VOICE {
                let period = u32::from(self.regs[REG_NOISE_PERIOD]).max(1) << 6;
                for s in buf.iter_mut().take(frames) {
                    let v = &mut self.voices[voice];
                    v.phase += period;
                    while v.phase >= self.rate {
                        v.phase -= self.rate;
                        let tap = if self.short_lfsr { 6 } else { 13 };
                        let bit = (self.lfsr ^ (self.lfsr >> tap)) & 1;
                        self.lfsr = (self.lfsr >> 1) | (bit << 16);
                    }
                    *s = if self.lfsr & 1 != 0 { amp } else { -amp };
                }
            } else {
                let period = u32::from(self.regs[voice * 2])
                    | (u32::from(self.regs[voice * 2 + 1]) << 8);
                let step = CLOCK / (16 * period.max(1));
                for s in buf.iter_mut().take(frames) {
                    let v = &mut self.voices[voice];
                    v.phase += step;
                    while v.phase >= self.rate {
                        v.phase -= self.rate;
                        v.level = !v.level;
                    }
                    *s = if v.level { amp } else { -amp };
                }
            }

            self.osc[voice].clear();
            self.osc[voice].extend_from_slice(&buf[..frames.min(buf.len())]);
        }
    }

    fn reset(&mut self) {
        self.regs = [0; 16];
        self.voices = Default::default();
        self.lfsr = 1;
        self.short_lfsr = false;
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

    fn register_pool(&self) -> &[u8] {
        &self.regs
    }

    fn osc_buffer(&self, chan: usize) -> Option<&[i16]> {
        self.osc.get(chan).map(|b| b.as_slice())
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

    fn flags(&self) -> ChipFlags {
        ChipFlags {
            keyoff_stops_arpeggio: true,
            keyoff_stops_porta: false,
            global_volume: false,
        }
    }
}
