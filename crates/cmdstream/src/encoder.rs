//! Fixed-width command encoder

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::command::{Command, CommandClass, CommandKind, OperandShape, NOTE_NULL};
use crate::opcode::{opcodes, LEGATO_NULL};
use crate::writer::StreamWriter;
use crate::RECORD_SIZE;

use log::warn;

fn clamp_note(note: i32) -> u8 {
    (note + 60).clamp(0, opcodes::LAST_NOTE as i32) as u8
}

/// Append one playback event to `w` in its canonical fixed-width form.
///
/// The record is zero-padded to the next 8-byte boundary so every later
/// pass can walk the stream with a fixed stride.
pub fn encode_command(w: &mut StreamWriter, cmd: &Command) {
    debug_assert!(w.tell() % RECORD_SIZE == 0);

    let def = cmd.kind.def();

    match def.class {
        CommandClass::Internal => {
            warn!("command {:?} is not encodable!", cmd.kind);
            return;
        }
        CommandClass::Common => {
            if cmd.kind == CommandKind::NoteOn {
                if cmd.value == NOTE_NULL {
                    w.write_u8(opcodes::NOTE_ON_NULL);
                } else {
                    w.write_u8(clamp_note(cmd.value));
                }
            } else {
                w.write_u8(opcodes::HINT_BASE + cmd.kind.id());
            }
        }
        CommandClass::Extended => {
            w.write_u8(opcodes::CMD_PREFIX);
            w.write_u8(cmd.kind.id());
        }
    }

    match def.shape {
        OperandShape::None => {}
        OperandShape::Byte => {
            if cmd.kind == CommandKind::HintLegato && cmd.value == NOTE_NULL {
                w.write_u8(LEGATO_NULL);
            } else if cmd.kind == CommandKind::HintLegato {
                w.write_u8(clamp_note(cmd.value));
            } else {
                w.write_u8(cmd.value as u8);
            }
        }
        OperandShape::BytePair => {
            w.write_u8(cmd.value as u8);
            w.write_u8(cmd.value2 as u8);
        }
        OperandShape::Short => {
            w.write_i16(cmd.value as i16);
        }
        OperandShape::ShortPair => {
            w.write_i16(cmd.value as i16);
            w.write_i16(cmd.value2 as i16);
        }
        OperandShape::UShort => {
            w.write_u16(cmd.value as u16);
        }
        OperandShape::Word => {
            w.write_u32(cmd.value as u32);
        }
        OperandShape::PortaFlags => {
            let mut flags = 0u8;
            if cmd.value != 0 {
                flags |= 0x80;
            }
            if cmd.value2 != 0 {
                flags |= 0x40;
            }
            w.write_u8(flags);
        }
        OperandShape::FixedFreq => {
            w.write_u16(((cmd.value as u16) << 12) | (cmd.value2 as u16 & 0x7ff));
        }
        OperandShape::SweepFlags => {
            let mut flags = cmd.value2 as u8 & 0x77;
            if cmd.value != 0 {
                flags |= 8;
            }
            w.write_u8(flags);
        }
    }

    w.pad_to(RECORD_SIZE);
}
