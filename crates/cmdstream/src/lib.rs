//! Command stream compiler

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

mod writer;

pub mod command;
pub mod encoder;
pub mod errors;
pub mod export;
pub mod nopstrip;
pub mod opcode;
pub mod pack;
pub mod reloc;
pub mod replay;
pub mod subblock;

pub use command::{Command, CommandKind, NOTE_NULL};
pub use replay::{PlaybackPos, Replayer};
pub use writer::StreamWriter;

/// Fixed-width record stride used by every pass before packing.
pub const RECORD_SIZE: usize = 8;
