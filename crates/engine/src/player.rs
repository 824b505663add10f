//! Pattern player and headless replay loop

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::chips::{PsgChip, WaveChip};
use crate::dispatch::{ChipDispatch, RegisterWrite};
use crate::effect::{EffectKind, EffectRegistry};
use crate::errors::SongError;
use crate::song::{ChipId, Row, Song};

use cmdstream::{Command, CommandKind, PlaybackPos, Replayer};

use log::warn;

use std::collections::HashSet;

const DEFAULT_RATE: u32 = 44100;
const MAX_VOLUME: i32 = 127;

// portamento targets for the one-directional slides
const PORTA_TOP: i32 = 96;
const PORTA_BOTTOM: i32 = -60;

#[derive(Default, Clone)]
struct ChannelState {
    note: i32,
    volume: i32,
    vol_slide: i32,
    vib_depth: u8,
    vib_rate: u8,
    vib_pos: usize,
    porta_target: Option<i32>,
    porta_speed: i32,
    arp: u8,
    arp_stage: usize,
}

impl ChannelState {
    fn fresh() -> Self {
        Self {
            volume: MAX_VOLUME,
            ..Self::default()
        }
    }
}

pub struct Engine {
    song: Song,
    chips: Vec<Box<dyn ChipDispatch>>,
    // global channel -> (chip index, chip-local channel)
    chan_map: Vec<(usize, usize)>,
    effects: EffectRegistry,

    chans: Vec<ChannelState>,
    order: usize,
    row: usize,
    tick_in_row: usize,
    speed: u8,
    tick_rate: f64,
    stopped: bool,
    visited: HashSet<(usize, usize)>,

    cmd_buffer: Vec<Command>,
    vib_table: [i32; 64],
}

impl Engine {
    pub fn new(song: Song) -> Result<Self, SongError> {
        song.validate()?;

        let mut chips: Vec<Box<dyn ChipDispatch>> = Vec::with_capacity(song.chips.len());
        for id in &song.chips {
            chips.push(match id {
                ChipId::Psg => Box::new(PsgChip::new()),
                ChipId::Wave => Box::new(WaveChip::new()),
            });
        }

        let mut chan_map = Vec::new();
        for (ci, chip) in chips.iter_mut().enumerate() {
            let granted = chip.init(DEFAULT_RATE);
            for local in 0..granted {
                chan_map.push((ci, local));
            }
        }
        if chan_map.is_empty() {
            return Err(SongError::NoChannels);
        }

        for (oi, entry) in song.orders.iter().enumerate() {
            if entry.len() != chan_map.len() {
                return Err(SongError::OrderWidthMismatch {
                    order: oi,
                    expected: chan_map.len(),
                    found: entry.len(),
                });
            }
            for (chan, &pat) in entry.iter().enumerate() {
                if usize::from(pat) >= song.patterns.len() {
                    return Err(SongError::PatternOutOfRange {
                        order: oi,
                        chan,
                        pattern: pat,
                    });
                }
            }
        }

        let mut vib_table = [0; 64];
        for (i, v) in vib_table.iter_mut().enumerate() {
            *v = (127.0 * (i as f64 / 64.0 * std::f64::consts::TAU).sin()) as i32;
        }

        let speed = song.speed;
        let tick_rate = song.tick_rate;
        let chans = vec![ChannelState::fresh(); chan_map.len()];

        Ok(Self {
            song,
            chips,
            chan_map,
            effects: EffectRegistry::new(),
            chans,
            order: 0,
            row: 0,
            tick_in_row: 0,
            speed,
            tick_rate,
            stopped: false,
            visited: HashSet::new(),
            cmd_buffer: Vec::new(),
            vib_table,
        })
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn chip_count(&self) -> usize {
        self.chips.len()
    }

    pub fn chip(&self, index: usize) -> &dyn ChipDispatch {
        self.chips[index].as_ref()
    }

    pub fn set_register_dump(&mut self, enabled: bool) {
        for chip in self.chips.iter_mut() {
            chip.set_register_dump(enabled);
        }
    }

    /// Register writes since the last drain, as (chip index, write).
    pub fn drain_register_writes(&mut self) -> Vec<(usize, RegisterWrite)> {
        let mut out = Vec::new();
        for (ci, chip) in self.chips.iter_mut().enumerate() {
            for w in chip.drain_register_writes() {
                out.push((ci, w));
            }
        }
        out
    }

    /// Render one buffer per global channel.
    pub fn render(&mut self, frames: usize) -> Vec<Vec<i16>> {
        let mut out = vec![vec![0i16; frames]; self.chan_map.len()];

        let mut bufs = out.iter_mut();
        for chip in self.chips.iter_mut() {
            let mut chip_bufs: Vec<&mut [i16]> = bufs
                .by_ref()
                .take(chip.channel_count())
                .map(|b| b.as_mut_slice())
                .collect();
            chip.acquire(&mut chip_bufs, frames);
        }

        out
    }

    fn row_data(&self, chan: usize) -> Option<Row> {
        let pat = usize::from(self.song.orders[self.order][chan]);
        self.song.patterns[pat].rows.get(self.row).cloned()
    }

    /// Dispatch to the owning chip and record into the capture buffer.
    fn emit(&mut self, cmd: Command) {
        let (chip, local) = self.chan_map[cmd.chan];
        let mut chip_cmd = cmd;
        chip_cmd.chan = local;
        self.chips[chip].dispatch(&chip_cmd);
        self.cmd_buffer.push(cmd);
    }

    fn control_for_row(
        song: &Song,
        effects: &EffectRegistry,
        chan_count: usize,
        order: usize,
        row: usize,
    ) -> (Option<(usize, usize)>, bool) {
        let mut jump = None;
        let mut stop = false;

        for chan in 0..chan_count {
            let pat = usize::from(song.orders[order][chan]);
            if let Some(r) = song.patterns[pat].rows.get(row) {
                for &(fx, val) in &r.effects {
                    match effects.get(fx).map(|d| d.kind) {
                        Some(EffectKind::OrderJump) => jump = Some((usize::from(val), 0)),
                        Some(EffectKind::PatternBreak) => {
                            jump = Some((order + 1, usize::from(val)))
                        }
                        Some(EffectKind::Stop) => stop = true,
                        _ => {}
                    }
                }
            }
        }

        (jump, stop)
    }

    fn advance_pos(&self, jump: Option<(usize, usize)>, order: usize, row: usize) -> (usize, usize) {
        let n_orders = self.song.orders.len();
        match jump {
            Some((o, r)) => (o % n_orders, r.min(self.song.pattern_len - 1)),
            None => {
                if row + 1 >= self.song.pattern_len {
                    ((order + 1) % n_orders, 0)
                } else {
                    (order, row + 1)
                }
            }
        }
    }

    /// Simulate order flow without playing: the first revisited
    /// (order, row) is the loop point; a stop effect means no loop.
    fn walk(&self) -> Option<PlaybackPos> {
        let mut visited = HashSet::new();
        let (mut order, mut row) = (0, 0);

        loop {
            if !visited.insert((order, row)) {
                return Some(PlaybackPos { order, row });
            }
            let (jump, stop) =
                Self::control_for_row(&self.song, &self.effects, self.chan_map.len(), order, row);
            if stop {
                return None;
            }
            let next = self.advance_pos(jump, order, row);
            order = next.0;
            row = next.1;
        }
    }

    fn process_row(&mut self) {
        for chan in 0..self.chan_map.len() {
            let data = match self.row_data(chan) {
                Some(d) => d,
                None => continue,
            };

            if data.off {
                self.emit(Command::new(CommandKind::NoteOff, chan, 0, 0));
                let flags = self.chips[self.chan_map[chan].0].flags();
                if flags.keyoff_stops_arpeggio {
                    self.chans[chan].arp = 0;
                }
                if flags.keyoff_stops_porta {
                    self.chans[chan].porta_target = None;
                    self.chans[chan].porta_speed = 0;
                }
            }

            if let Some(ins) = data.instrument {
                self.emit(Command::new(CommandKind::Instrument, chan, ins.into(), 0));
            }

            if let Some(vol) = data.volume {
                let vol = i32::from(vol).min(MAX_VOLUME);
                self.chans[chan].volume = vol;
                self.chans[chan].vol_slide = 0;
                self.emit(Command::new(CommandKind::HintVolume, chan, vol, 0));
            }

            let tone_porta = data.effects.iter().find_map(|&(fx, val)| {
                match self.effects.get(fx).map(|d| d.kind) {
                    Some(EffectKind::TonePorta) => Some(val),
                    _ => None,
                }
            });

            if let Some(note) = data.note {
                match tone_porta {
                    Some(speed) => {
                        self.chans[chan].porta_target = Some(note);
                        self.chans[chan].porta_speed = i32::from(speed);
                        self.emit(Command::new(CommandKind::HintPorta, chan, note, speed.into()));
                    }
                    None => {
                        self.chans[chan].note = note;
                        self.emit(Command::note_on(chan, note));
                    }
                }
            }

            for &(fx, val) in &data.effects {
                let def = match self.effects.get(fx) {
                    Some(d) => *d,
                    None => {
                        warn!("unknown effect ${:02x}", fx);
                        continue;
                    }
                };

                match def.kind {
                    EffectKind::Arpeggio => {
                        self.chans[chan].arp = val;
                        self.chans[chan].arp_stage = 0;
                        self.emit(Command::new(
                            CommandKind::HintArpeggio,
                            chan,
                            i32::from(val >> 4),
                            i32::from(val & 0x0f),
                        ));
                    }
                    EffectKind::PortaUp => {
                        self.chans[chan].porta_target = Some(PORTA_TOP);
                        self.chans[chan].porta_speed = i32::from(val);
                        self.emit(Command::new(
                            CommandKind::HintPorta,
                            chan,
                            PORTA_TOP,
                            val.into(),
                        ));
                    }
                    EffectKind::PortaDown => {
                        self.chans[chan].porta_target = Some(PORTA_BOTTOM);
                        self.chans[chan].porta_speed = i32::from(val);
                        self.emit(Command::new(
                            CommandKind::HintPorta,
                            chan,
                            PORTA_BOTTOM,
                            val.into(),
                        ));
                    }
                    EffectKind::TonePorta => {
                        // handled with the note column
                    }
                    EffectKind::Vibrato => {
                        self.chans[chan].vib_depth = val & 0x0f;
                        self.chans[chan].vib_rate = val >> 4;
                        self.emit(Command::new(
                            CommandKind::HintVibrato,
                            chan,
                            i32::from(val & 0x0f),
                            i32::from(val >> 4),
                        ));
                    }
                    EffectKind::Panning => {
                        let left = i32::from(val >> 4) * 17;
                        let right = i32::from(val & 0x0f) * 17;
                        self.emit(Command::new(CommandKind::Panning, chan, left, right));
                    }
                    EffectKind::VolSlide => {
                        let slide = i32::from(val >> 4) - i32::from(val & 0x0f);
                        self.chans[chan].vol_slide = slide;
                        self.emit(Command::new(CommandKind::HintVolSlide, chan, slide, 0));
                    }
                    EffectKind::Speed => {
                        if val > 0 {
                            self.speed = val;
                        }
                    }
                    EffectKind::TickRate => {
                        if val > 0 {
                            self.tick_rate = f64::from(val);
                        }
                    }
                    EffectKind::OrderJump | EffectKind::PatternBreak | EffectKind::Stop => {
                        // order flow, applied when the row ends
                    }
                }
            }
        }
    }

    fn run_tick_effects(&mut self) {
        for chan in 0..self.chan_map.len() {
            let state = self.chans[chan].clone();

            if state.vol_slide != 0 {
                let vol = (state.volume + state.vol_slide).clamp(0, MAX_VOLUME);
                self.chans[chan].volume = vol;
                self.emit(Command::new(CommandKind::Volume, chan, vol, 0));
            }

            if state.vib_depth > 0 {
                let pos = (state.vib_pos + usize::from(state.vib_rate)) & 63;
                self.chans[chan].vib_pos = pos;
                let pitch = self.vib_table[pos] * i32::from(state.vib_depth) / 15;
                self.emit(Command::new(CommandKind::Pitch, chan, pitch, 0));
            }

            if let Some(target) = state.porta_target {
                if state.porta_speed != 0 {
                    self.emit(Command::new(
                        CommandKind::NotePorta,
                        chan,
                        state.porta_speed,
                        target,
                    ));
                }
            }

            if state.arp != 0 && state.porta_target.is_none() {
                let offset = match state.arp_stage {
                    1 => i32::from(state.arp >> 4),
                    2 => i32::from(state.arp & 0x0f),
                    _ => 0,
                };
                self.chans[chan].arp_stage = (state.arp_stage + 1) % 3;
                self.emit(Command::new(
                    CommandKind::Legato,
                    chan,
                    state.note + offset,
                    0,
                ));
            }
        }
    }
}

impl Replayer for Engine {
    fn channel_count(&self) -> usize {
        self.chan_map.len()
    }

    fn loop_point(&mut self) -> Option<PlaybackPos> {
        self.walk()
    }

    fn play_from_start(&mut self) {
        for chip in self.chips.iter_mut() {
            chip.reset();
        }
        for chan in self.chans.iter_mut() {
            *chan = ChannelState::fresh();
        }
        self.order = 0;
        self.row = 0;
        self.tick_in_row = 0;
        self.speed = self.song.speed;
        self.tick_rate = self.song.tick_rate;
        self.stopped = false;
        self.visited.clear();
        self.cmd_buffer.clear();
    }

    fn position(&self) -> PlaybackPos {
        PlaybackPos {
            order: self.order,
            row: self.row,
        }
    }

    fn on_row_boundary(&self) -> bool {
        self.tick_in_row == 0
    }

    fn tick_rate(&self) -> f64 {
        self.tick_rate
    }

    fn next_tick(&mut self, commands: &mut Vec<Command>) -> bool {
        if self.stopped {
            return true;
        }

        if self.tick_in_row == 0 {
            if !self.visited.insert((self.order, self.row)) {
                // re-entered a played row: capture is complete
                return true;
            }
            self.process_row();
        }

        self.run_tick_effects();
        commands.append(&mut self.cmd_buffer);

        for chip in self.chips.iter_mut() {
            chip.tick(true);
        }

        self.tick_in_row += 1;
        if self.tick_in_row >= usize::from(self.speed) {
            self.tick_in_row = 0;
            let (jump, stop) =
                Self::control_for_row(&self.song, &self.effects, self.chan_map.len(), self.order, self.row);
            if stop {
                self.stopped = true;
            } else {
                let next = self.advance_pos(jump, self.order, self.row);
                self.order = next.0;
                self.row = next.1;
            }
        }

        false
    }
}
