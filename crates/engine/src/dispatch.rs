//! The uniform chip dispatch contract

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use cmdstream::Command;

/// One logged register write, drained per tick when dumping is enabled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RegisterWrite {
    pub addr: u32,
    pub value: u16,
}

/// Per-chip behavioral flags consulted by the pattern player.
#[derive(Debug, Copy, Clone, Default)]
pub struct ChipFlags {
    /// Key-off also halts a running arpeggio.
    pub keyoff_stops_arpeggio: bool,
    /// Key-off also halts a running portamento.
    pub keyoff_stops_porta: bool,
    /// Volume is a chip-global resource rather than per-channel.
    pub global_volume: bool,
}

/// State of a channel's macro interpreter, for frontends that draw it.
#[derive(Debug, Copy, Clone, Default)]
pub struct MacroState {
    pub pos: usize,
    pub value: i32,
    pub active: bool,
}

/// Contract every emulated chip backend satisfies.
///
/// The required methods cover the playback path: apply one event, advance
/// one frame, render audio. Everything else is an optional capability
/// with a no-op default, overridden only by chips that have the
/// underlying hardware feature; callers must tolerate the defaults.
pub trait ChipDispatch {
    /// Apply one playback event. Returns a chip-specific acknowledgement
    /// code; 0 means the event was ignored.
    fn dispatch(&mut self, cmd: &Command) -> i32;

    /// Advance internal oscillator/envelope state by one playback frame.
    fn tick(&mut self, system_tick: bool);

    /// Render audio into caller-provided per-channel buffers.
    fn acquire(&mut self, buffers: &mut [&mut [i16]], frames: usize);

    fn reset(&mut self);

    /// Prepare for playback at `suggested_rate` Hz. Returns the number of
    /// channels granted.
    fn init(&mut self, suggested_rate: u32) -> usize;

    fn quit(&mut self) {}

    fn channel_count(&self) -> usize;

    // Optional capabilities
    // =====================

    fn register_pool(&self) -> &[u8] {
        &[]
    }

    fn sample_mem(&self) -> &[u8] {
        &[]
    }

    fn sample_mem_usage(&self) -> usize {
        0
    }

    fn sample_mem_capacity(&self) -> usize {
        0
    }

    fn is_sample_loaded(&self, _index: usize) -> bool {
        false
    }

    fn mute_channel(&mut self, _chan: usize, _mute: bool) {}

    fn osc_buffer(&self, _chan: usize) -> Option<&[i16]> {
        None
    }

    fn macro_state(&self, _chan: usize) -> Option<&MacroState> {
        None
    }

    /// Enable/disable the register write trace consumed by exporters.
    fn set_register_dump(&mut self, _enabled: bool) {}

    fn drain_register_writes(&mut self) -> Vec<RegisterWrite> {
        Vec::new()
    }

    fn flags(&self) -> ChipFlags {
        ChipFlags::default()
    }

    fn volume_for_velocity(&self, velocity: u8) -> u8 {
        velocity
    }
}
