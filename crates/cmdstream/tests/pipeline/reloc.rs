// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::*;

use cmdstream::reloc::{relocate_fixed, relocate_packed};

fn fixture() -> Vec<u8> {
    let mut stream = records(&[&[0x42], &[opcodes::WAIT_ONE]]);
    stream.extend(call_record(0x20));
    stream.extend(jump_record(0x08));
    stream
}

#[test]
fn fixed_relocation_adds_the_delta() {
    let mut stream = fixture();
    relocate_fixed(&mut stream, 0, 0x100).unwrap();

    let call = u32::from_le_bytes(stream[17..21].try_into().unwrap());
    let jump = u32::from_le_bytes(stream[25..29].try_into().unwrap());
    assert_eq!(call, 0x120);
    assert_eq!(jump, 0x108);
}

/// Relocating A -> B -> A is the identity.
#[test]
fn fixed_relocation_is_its_own_inverse() {
    let original = fixture();

    let mut stream = original.clone();
    relocate_fixed(&mut stream, 0, 0x4000).unwrap();
    assert_ne!(stream, original);
    relocate_fixed(&mut stream, 0x4000, 0).unwrap();
    assert_eq!(stream, original);
}

#[test]
fn call_by_symbol_is_not_relocated() {
    let mut stream = record(&[opcodes::CALL_SYMBOL, 7, 0, 0, 0]);
    relocate_fixed(&mut stream, 0, 0x100).unwrap();
    assert_eq!(stream, record(&[opcodes::CALL_SYMBOL, 7, 0, 0, 0]));
}

#[test]
fn operand_bytes_are_not_mistaken_for_opcodes() {
    // 0xfd's operand is 0xfa; a fixed-stride walk would misread it
    let mut stream = vec![opcodes::WAIT_SHORT, opcodes::JUMP, 0x42];
    stream.push(opcodes::CALL_LONG);
    stream.extend_from_slice(&0x10u32.to_le_bytes());

    let dial = SpeedDial::default();
    relocate_packed(&mut stream, 0, 0x30, &dial).unwrap();

    assert_eq!(stream[0..3], [opcodes::WAIT_SHORT, opcodes::JUMP, 0x42]);
    let call = u32::from_le_bytes(stream[4..8].try_into().unwrap());
    assert_eq!(call, 0x40);
}

#[test]
fn packed_relocation_rewrites_short_calls() {
    let mut stream = vec![opcodes::CALL_SHORT, 0x10, 0x00, opcodes::STOP];

    let dial = SpeedDial::default();
    relocate_packed(&mut stream, 0, 0x20, &dial).unwrap();

    assert_eq!(u16::from_le_bytes([stream[1], stream[2]]), 0x30);
}

#[test]
fn packed_relocation_rejects_unknown_opcodes() {
    let mut stream = vec![0xf6];
    let dial = SpeedDial::default();
    assert!(relocate_packed(&mut stream, 0, 0x20, &dial).is_err());
}
