//! Fixed-width to packed stream re-encoding

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::errors::PipelineError;
use crate::opcode::{instruction_len, opcodes, SpeedDial};
use crate::RECORD_SIZE;

/// Highest packed offset a short call may target. Leaves headroom so the
/// final relocation (which shifts everything past the file header) cannot
/// push a 16-bit address out of range.
pub const SHORT_CALL_LIMIT: u32 = 0xff00;

/// Re-encode an 8-byte-aligned stream into its packed variable-width
/// form.
///
/// The address table is built assuming every call stays long; a call
/// narrowed to the 3-byte short form is followed by two NOP filler bytes
/// so the table stays valid. The final packed-form NOP strip removes
/// them.
pub fn pack_stream(data: &[u8], dial: &SpeedDial) -> Result<Vec<u8>, PipelineError> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(PipelineError::UnalignedStream { len: data.len() });
    }

    let records = data.len() / RECORD_SIZE;

    let mut table = vec![0u32; records];
    let mut out_off = 0u32;
    for r in 0..records {
        let pos = r * RECORD_SIZE;
        let opcode = data[pos];
        let ext = data[pos + 1];

        match opcode {
            // only this pass produces short calls
            opcodes::CALL_SHORT => return Err(PipelineError::ShortCallBeforePack { pos }),
            opcodes::CALL_SYMBOL => {
                let id = u32::from_le_bytes(data[pos + 1..pos + 5].try_into().unwrap());
                return Err(PipelineError::UnresolvedSymbol { id, count: 0 });
            }
            _ => {}
        }

        table[r] = out_off;
        match instruction_len(opcode, ext, Some(dial)) {
            0 => return Err(PipelineError::LengthUndeterminable { opcode, ext, pos }),
            n => out_off += n as u32,
        }
    }

    let map = |addr: u32| -> Result<u32, PipelineError> {
        let idx = addr as usize / RECORD_SIZE;
        if addr as usize % RECORD_SIZE != 0 || idx >= records {
            return Err(PipelineError::OutOfRangeAddress {
                addr,
                len: data.len(),
            });
        }
        Ok(table[idx])
    };

    let mut out = Vec::with_capacity(out_off as usize);
    for r in 0..records {
        let pos = r * RECORD_SIZE;
        let record = &data[pos..pos + RECORD_SIZE];
        let len = instruction_len(record[0], record[1], Some(dial));

        match record[0] {
            opcodes::CALL_LONG => {
                let target = map(u32::from_le_bytes(record[1..5].try_into().unwrap()))?;
                if target < SHORT_CALL_LIMIT {
                    out.push(opcodes::CALL_SHORT);
                    out.extend_from_slice(&(target as u16).to_le_bytes());
                    out.push(opcodes::NOP);
                    out.push(opcodes::NOP);
                } else {
                    out.push(opcodes::CALL_LONG);
                    out.extend_from_slice(&target.to_le_bytes());
                }
            }
            opcodes::JUMP => {
                let target = map(u32::from_le_bytes(record[1..5].try_into().unwrap()))?;
                out.push(opcodes::JUMP);
                out.extend_from_slice(&target.to_le_bytes());
            }
            _ => out.extend_from_slice(&record[0..len]),
        }
    }

    Ok(out)
}
