//! Playback engine: chip dispatch, pattern player, song data

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

pub mod chips;
pub mod dispatch;
pub mod effect;
pub mod errors;
pub mod player;
pub mod song;

pub use dispatch::{ChipDispatch, ChipFlags, MacroState, RegisterWrite};
pub use player::Engine;
pub use song::{load_song_file, ChipId, Pattern, Row, Song};
