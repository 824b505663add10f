//! Jump/call address relocation

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::errors::PipelineError;
use crate::opcode::{instruction_len_at, opcodes, SpeedDial};
use crate::RECORD_SIZE;

use log::warn;

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap())
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes(data[pos..pos + 2].try_into().unwrap())
}

fn rewrite_u32(data: &mut [u8], pos: usize, delta: i64) {
    let addr = read_u32(data, pos);
    let moved = (i64::from(addr) + delta) as u32;
    data[pos..pos + 4].copy_from_slice(&moved.to_le_bytes());
}

fn rewrite_u16(data: &mut [u8], pos: usize, delta: i64) {
    let addr = read_u16(data, pos);
    let moved = i64::from(addr) + delta;
    if !(0..=0xffff).contains(&moved) {
        // short calls are never widened here; only the packer does that
        warn!("relocated short call target ${:x} does not fit in 16 bits", moved);
    }
    data[pos..pos + 2].copy_from_slice(&(moved as u16).to_le_bytes());
}

/// Rewrite embedded addresses in a fixed-width stream moved from
/// `old_base` to `new_base`.
///
/// Call-by-symbol operands are ordinals, not addresses, and are left
/// untouched.
pub fn relocate_fixed(
    data: &mut [u8],
    old_base: usize,
    new_base: usize,
) -> Result<(), PipelineError> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(PipelineError::UnalignedStream { len: data.len() });
    }

    let delta = new_base as i64 - old_base as i64;

    let mut pos = 0;
    while pos < data.len() {
        match data[pos] {
            opcodes::CALL_LONG | opcodes::JUMP => rewrite_u32(data, pos + 1, delta),
            _ => {}
        }
        pos += RECORD_SIZE;
    }

    Ok(())
}

/// Variable-width overload of [`relocate_fixed`], driven by the
/// instruction-length table.
pub fn relocate_packed(
    data: &mut [u8],
    old_base: usize,
    new_base: usize,
    dial: &SpeedDial,
) -> Result<(), PipelineError> {
    let delta = new_base as i64 - old_base as i64;

    let mut pos = 0;
    while pos < data.len() {
        let len = instruction_len_at(data, pos, Some(dial))?;
        match data[pos] {
            opcodes::CALL_LONG | opcodes::JUMP => rewrite_u32(data, pos + 1, delta),
            opcodes::CALL_SHORT => rewrite_u16(data, pos + 1, delta),
            _ => {}
        }
        pos += len;
    }

    Ok(())
}
