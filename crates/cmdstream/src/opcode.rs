//! Stream opcode space and the instruction-length table

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::command::{CommandClass, CommandKind};
use crate::errors::PipelineError;

// Using lower case to match instruction names in the stream player.
pub mod opcodes {
    // opcodes 0x00 - 0xb3 are note-on opcodes

    pub const LAST_NOTE: u8 = 0xb3;
    pub const NOTE_ON_NULL: u8 = 0xb4;

    // opcodes 0xb5 - 0xcf are hinted command aliases (0xb4 + command id)
    pub const HINT_BASE: u8 = 0xb4;
    pub const LAST_HINT: u8 = 0xcf;

    pub const SPEED_DIAL_CMD_BASE: u8 = 0xd0;
    pub const SPEED_DIAL_DELAY_BASE: u8 = 0xe0;

    pub const MARKER: u8 = 0xf0;
    pub const NOP: u8 = 0xf1;
    pub const CALL_SYMBOL: u8 = 0xf4;
    pub const CALL_LONG: u8 = 0xf5;
    pub const CMD_PREFIX: u8 = 0xf7;
    pub const CALL_SHORT: u8 = 0xf8;
    pub const RETURN: u8 = 0xf9;
    pub const JUMP: u8 = 0xfa;
    pub const RATE: u8 = 0xfb;
    pub const WAIT_LONG: u8 = 0xfc;
    pub const WAIT_SHORT: u8 = 0xfd;
    pub const WAIT_ONE: u8 = 0xfe;
    pub const STOP: u8 = 0xff;
}

/// Legato payload byte standing in for the null note.
pub const LEGATO_NULL: u8 = 0xff;

/// Per-stream speed-dial tables: the 16 most frequent delay run lengths
/// and the 16 most frequent extended command ids, written into the
/// container header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedDial {
    pub delays: [u8; 16],
    pub cmds: [u8; 16],
}

impl SpeedDial {
    pub fn cmd_slot(&self, id: u8) -> Option<usize> {
        // slot 0 on a blank table would alias command id 0
        self.cmds.iter().position(|&c| c == id && id != 0)
    }

    pub fn delay_slot(&self, len: u8) -> Option<usize> {
        self.delays.iter().position(|&d| d == len && len != 0)
    }
}

fn command_len(id: u8) -> usize {
    match CommandKind::from_u8(id) {
        Some(kind) => {
            let def = kind.def();
            match def.class {
                CommandClass::Internal => 0,
                _ => def.shape.encoded_len(),
            }
        }
        None => 0,
    }
}

/// Packed length of the instruction starting with `opcode`, in bytes.
///
/// `ext` is the byte following the opcode; it is only inspected for the
/// generic command prefix. Returns 0 when the length cannot be
/// determined, which every stream walk treats as a fatal inconsistency.
pub fn instruction_len(opcode: u8, ext: u8, dial: Option<&SpeedDial>) -> usize {
    use opcodes as op;

    match opcode {
        0x00..=op::NOTE_ON_NULL => 1,
        0xb5..=op::LAST_HINT => match command_len(opcode - op::HINT_BASE) {
            0 => match CommandKind::from_u8(opcode - op::HINT_BASE) {
                // a hinted alias with an empty payload is still valid
                Some(k) if k.def().class == CommandClass::Common => 1,
                _ => 0,
            },
            n => 1 + n,
        },
        0xd0..=0xdf => match dial {
            Some(dial) => match command_len(dial.cmds[(opcode & 15) as usize]) {
                0 => 0,
                n => 1 + n,
            },
            None => 0,
        },
        0xe0..=0xef => 1,
        op::MARKER => 4,
        op::NOP => 1,
        op::CALL_SYMBOL => 5,
        op::CALL_LONG => 5,
        op::CMD_PREFIX => match CommandKind::from_u8(ext) {
            Some(kind) if kind.def().class != CommandClass::Internal => {
                2 + kind.def().shape.encoded_len()
            }
            _ => 0,
        },
        op::CALL_SHORT => 3,
        op::RETURN => 1,
        op::JUMP => 5,
        op::RATE => 5,
        op::WAIT_LONG => 3,
        op::WAIT_SHORT => 2,
        op::WAIT_ONE => 1,
        op::STOP => 1,
        _ => 0,
    }
}

/// Length of the packed instruction at `pos`, bounds-checked.
pub fn instruction_len_at(
    data: &[u8],
    pos: usize,
    dial: Option<&SpeedDial>,
) -> Result<usize, PipelineError> {
    if pos >= data.len() {
        return Err(PipelineError::TruncatedRecord { pos });
    }

    let opcode = data[pos];
    let ext = if pos + 1 < data.len() { data[pos + 1] } else { 0 };

    match instruction_len(opcode, ext, dial) {
        0 => Err(PipelineError::LengthUndeterminable { opcode, ext, pos }),
        n if pos + n > data.len() => Err(PipelineError::TruncatedRecord { pos }),
        n => Ok(n),
    }
}
