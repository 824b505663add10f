//! Chip backends

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

pub mod psg;
pub mod wave;

pub use psg::PsgChip;
pub use wave::WaveChip;

/// Note 0 is C-4 (261.63 Hz); one step per semitone.
pub(crate) fn note_freq(note: i32) -> f64 {
    261.6256 * (2f64).powf(note as f64 / 12.0)
}
