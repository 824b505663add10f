//! JSON song data

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::errors::{DeserializeError, SongError};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

fn default_tick_rate() -> f64 {
    60.0
}

fn default_speed() -> u8 {
    6
}

fn default_pattern_len() -> usize {
    64
}

#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChipId {
    Psg,
    Wave,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Row {
    /// Semitones relative to C-4.
    #[serde(default)]
    pub note: Option<i32>,

    /// Note off (key release) on this row.
    #[serde(default)]
    pub off: bool,

    #[serde(default)]
    pub instrument: Option<u8>,

    #[serde(default)]
    pub volume: Option<u8>,

    /// (effect id, effect value) pairs.
    #[serde(default)]
    pub effects: Vec<(u8, u8)>,
}

/// One channel's rows. Rows past the end of the list are empty.
#[derive(Deserialize, Debug, Clone)]
pub struct Pattern {
    pub rows: Vec<Row>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Song {
    #[serde(default)]
    pub name: String,

    pub chips: Vec<ChipId>,

    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,

    /// Ticks per row.
    #[serde(default = "default_speed")]
    pub speed: u8,

    #[serde(default = "default_pattern_len")]
    pub pattern_len: usize,

    /// `orders[order][channel]` is a pattern index.
    pub orders: Vec<Vec<u8>>,

    pub patterns: Vec<Pattern>,
}

impl Song {
    pub fn validate(&self) -> Result<(), SongError> {
        if self.chips.is_empty() {
            return Err(SongError::NoChips);
        }
        if self.orders.is_empty() {
            return Err(SongError::NoOrders);
        }
        if self.speed == 0 {
            return Err(SongError::BadSpeed);
        }
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(SongError::BadTickRate);
        }
        if self.pattern_len == 0 {
            return Err(SongError::BadPatternLen);
        }
        Ok(())
    }
}

pub fn load_song_file(path: &Path) -> Result<Song, DeserializeError> {
    let file_name = path.display().to_string();

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => return Err(DeserializeError::OpenError(file_name, e)),
    };

    match serde_json::from_reader(BufReader::new(file)) {
        Ok(song) => Ok(song),
        Err(e) => Err(DeserializeError::SerdeError(file_name, e)),
    }
}
