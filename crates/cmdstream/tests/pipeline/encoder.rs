// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::*;

use cmdstream::command::{CommandClass, NOTE_NULL};
use cmdstream::opcode::instruction_len;

#[test]
fn every_record_is_one_stride() {
    for kind in CommandKind::ALL {
        if kind.def().class == CommandClass::Internal {
            continue;
        }
        let data = encode(&Command::new(kind, 0, 1, 2));
        assert_eq!(data.len(), RECORD_SIZE, "{:?}", kind);
    }
}

/// The length table must agree with the encoder for every opcode it can
/// produce.
#[test]
fn instruction_table_matches_encoder() {
    for kind in CommandKind::ALL {
        let def = kind.def();
        if def.class == CommandClass::Internal {
            continue;
        }

        let data = encode(&Command::new(kind, 0, 1, 2));
        let prefix = match def.class {
            CommandClass::Common => 1,
            _ => 2,
        };
        let written = prefix + def.shape.encoded_len();

        assert_eq!(
            instruction_len(data[0], data[1], None),
            written,
            "{:?}",
            kind
        );
        // the rest of the record is padding
        assert!(data[written..].iter().all(|&b| b == 0), "{:?}", kind);
    }
}

#[test]
fn internal_commands_encode_nothing() {
    let data = encode(&Command::new(CommandKind::Volume, 0, 64, 0));
    assert!(data.is_empty());
}

#[test]
fn null_note_on() {
    let data = encode(&Command::note_on(0, NOTE_NULL));
    assert_eq!(data, record(&[opcodes::NOTE_ON_NULL]));
}

#[test]
fn note_on_is_clamped_to_the_note_range() {
    let data = encode(&Command::note_on(0, 0));
    assert_eq!(data[0], 60);

    let data = encode(&Command::note_on(0, 500));
    assert_eq!(data[0], opcodes::LAST_NOTE);

    let data = encode(&Command::note_on(0, -500));
    assert_eq!(data[0], 0);
}

#[test]
fn legato_null_note_payload() {
    let data = encode(&Command::new(CommandKind::HintLegato, 0, NOTE_NULL, 0));
    assert_eq!(data[0], opcodes::HINT_BASE + CommandKind::HintLegato as u8);
    assert_eq!(data[1], 0xff);
}

#[test]
fn extended_commands_use_the_generic_prefix() {
    let data = encode(&Command::new(CommandKind::FmTl, 2, 3, 0x7f));
    assert_eq!(
        data,
        record(&[opcodes::CMD_PREFIX, CommandKind::FmTl as u8, 3, 0x7f])
    );
}

#[test]
fn signed_short_operand_is_little_endian() {
    let data = encode(&Command::new(CommandKind::HintVolSlide, 0, -2, 0));
    assert_eq!(data[0], opcodes::HINT_BASE + CommandKind::HintVolSlide as u8);
    assert_eq!(i16::from_le_bytes([data[1], data[2]]), -2);
}

#[test]
fn porta_flags_fold_into_one_byte() {
    let data = encode(&Command::new(CommandKind::PrePorta, 0, 1, 1));
    assert_eq!(data[1], 0xc0);

    let data = encode(&Command::new(CommandKind::PrePorta, 0, 0, 1));
    assert_eq!(data[1], 0x40);
}

#[test]
fn fixed_freq_packs_block_and_fnum() {
    let data = encode(&Command::new(CommandKind::FmFixFreq, 0, 5, 0x7ff));
    let packed = u16::from_le_bytes([data[2], data[3]]);
    assert_eq!(packed, (5 << 12) | 0x7ff);
}
