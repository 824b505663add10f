//! Replay interface consumed by the export driver

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::command::Command;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlaybackPos {
    pub order: usize,
    pub row: usize,
}

/// A headless, tick-accurate song player.
///
/// The export driver never names a concrete engine type; anything that
/// can replay a song and hand over its per-tick playback events can be
/// captured into a command stream.
pub trait Replayer {
    fn channel_count(&self) -> usize;

    /// First (order, row) position playback revisits, or `None` when the
    /// song halts instead of looping.
    fn loop_point(&mut self) -> Option<PlaybackPos>;

    /// Rewind to the start of the song for a capture run.
    fn play_from_start(&mut self);

    fn position(&self) -> PlaybackPos;

    /// True when the next tick is the first tick of its row.
    fn on_row_boundary(&self) -> bool;

    /// Current tick rate in Hz.
    fn tick_rate(&self) -> f64;

    /// Advance one tick, appending this tick's events to `commands`.
    ///
    /// Returns true once the capture run is complete: the song stopped,
    /// or playback is about to re-enter the loop point.
    fn next_tick(&mut self, commands: &mut Vec<Command>) -> bool;
}
