//! A single location for all of the errors in the engine

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use std::fmt::Display;
use std::io;

#[derive(Debug)]
pub enum DeserializeError {
    OpenError(String, io::Error),
    SerdeError(String, serde_json::error::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub enum SongError {
    NoChips,
    NoOrders,
    NoChannels,
    BadSpeed,
    BadTickRate,
    BadPatternLen,

    OrderWidthMismatch {
        order: usize,
        expected: usize,
        found: usize,
    },
    PatternOutOfRange {
        order: usize,
        chan: usize,
        pattern: u8,
    },
}

// Display
// =======

impl Display for DeserializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenError(file_name, e) => write!(f, "Unable to open {}: {}", file_name, e),
            Self::SerdeError(file_name, e) => write!(f, "Unable to read {}: {}", file_name, e),
        }
    }
}

impl Display for SongError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoChips => write!(f, "song has no chips"),
            Self::NoOrders => write!(f, "song has no orders"),
            Self::NoChannels => write!(f, "chips granted no channels"),
            Self::BadSpeed => write!(f, "speed must be nonzero"),
            Self::BadTickRate => write!(f, "tick rate must be positive"),
            Self::BadPatternLen => write!(f, "pattern length must be nonzero"),
            Self::OrderWidthMismatch {
                order,
                expected,
                found,
            } => write!(
                f,
                "order {} has {} entries, expected {}",
                order, found, expected
            ),
            Self::PatternOutOfRange {
                order,
                chan,
                pattern,
            } => write!(
                f,
                "order {} channel {} references missing pattern {}",
                order, chan, pattern
            ),
        }
    }
}

impl std::error::Error for DeserializeError {}
impl std::error::Error for SongError {}
