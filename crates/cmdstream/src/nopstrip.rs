//! NOP slot removal with address compaction

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

/// Remove NOP records from a fixed-width stream, rewriting every
/// jump/call target to compensate.
///
/// A jump/call that points at a NOP slot or out of bounds is a pipeline
/// bug and fails the pass.
pub fn strip_nops_fixed(data: &[u8]) -> Result<Vec<u8>, PipelineError> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(PipelineError::UnalignedStream { len: data.len() });
    }

    let records = data.len() / RECORD_SIZE;

    // old record offset -> new offset; None for removed slots
    let mut table: Vec<Option<u32>> = vec![None; records];
    let mut out_off = 0u32;
    for r in 0..records {
        if data[r * RECORD_SIZE] != opcodes::NOP {
            table[r] = Some(out_off);
            out_off += RECORD_SIZE as u32;
        }
    }

    let map = |addr: u32, pos: usize| -> Result<u32, PipelineError> {
        let idx = addr as usize / RECORD_SIZE;
        if addr as usize % RECORD_SIZE != 0 || idx >= records {
            return Err(PipelineError::OutOfRangeAddress {
                addr,
                len: data.len(),
            });
        }
        table[idx].ok_or(PipelineError::NopTarget { addr, pos })
    };

    let mut out = Vec::with_capacity(out_off as usize);
    for r in 0..records {
        let pos = r * RECORD_SIZE;
        if table[r].is_none() {
            continue;
        }

        let mut record: [u8; RECORD_SIZE] = data[pos..pos + RECORD_SIZE].try_into().unwrap();
        match record[0] {
            opcodes::CALL_LONG | opcodes::JUMP => {
                let addr = map(read_u32(&record, 1), pos)?;
                record[1..5].copy_from_slice(&addr.to_le_bytes());
            }
            // call-by-symbol carries an ordinal, not an address
            _ => {}
        }
        out.extend_from_slice(&record);
    }

    Ok(out)
}

/// Packed-form NOP strip.
///
/// Packed-stream NOPs are fillers left behind by call narrowing, so an
/// address that cannot be remapped is only warned about and left as-is.
pub fn strip_nops_packed(data: &[u8], dial: &SpeedDial) -> Result<Vec<u8>, PipelineError> {
    // byte offset -> new offset for every surviving instruction
    let mut table: Vec<Option<u32>> = vec![None; data.len()];
    let mut out_off = 0u32;
    let mut pos = 0;
    while pos < data.len() {
        let len = instruction_len_at(data, pos, Some(dial))?;
        if data[pos] != opcodes::NOP {
            table[pos] = Some(out_off);
            out_off += len as u32;
        }
        pos += len;
    }

    let map = |addr: u32, pos: usize| -> Option<u32> {
        match table.get(addr as usize).copied().flatten() {
            Some(new) => Some(new),
            None => {
                warn!(
                    "cannot remap address ${:x} in record at ${:x}! leaving it",
                    addr, pos
                );
                None
            }
        }
    };

    let mut out = Vec::with_capacity(out_off as usize);
    let mut pos = 0;
    while pos < data.len() {
        let len = instruction_len_at(data, pos, Some(dial))?;
        if data[pos] == opcodes::NOP {
            pos += len;
            continue;
        }

        let mut inst = data[pos..pos + len].to_vec();
        match inst[0] {
            opcodes::CALL_LONG | opcodes::JUMP => {
                if let Some(addr) = map(read_u32(&inst, 1), pos) {
                    inst[1..5].copy_from_slice(&addr.to_le_bytes());
                }
            }
            opcodes::CALL_SHORT => {
                let addr = u16::from_le_bytes(inst[1..3].try_into().unwrap());
                if let Some(new) = map(addr.into(), pos) {
                    inst[1..3].copy_from_slice(&(new as u16).to_le_bytes());
                }
            }
            _ => {}
        }
        out.extend_from_slice(&inst);
        pos += len;
    }

    Ok(out)
}
