//! Sub-block extraction: factoring repeated instruction runs into
//! callable blocks

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::errors::PipelineError;
use crate::nopstrip::strip_nops_fixed;
use crate::opcode::{instruction_len, opcodes, SpeedDial};
use crate::RECORD_SIZE;

use std::collections::{HashMap, HashSet};

/// Minimum matched span: four records.
pub const MIN_MATCH: usize = 4 * RECORD_SIZE;

/// An extracted, call-only-reachable instruction run, terminated with a
/// return record.
#[derive(Debug, Clone)]
pub struct SubBlock {
    pub data: Vec<u8>,
    /// Offset in the global stream, set once the driver places the block.
    pub offset: Option<usize>,
}

#[derive(Debug, Copy, Clone)]
struct Match {
    orig: usize,
    dup: usize,
    len: usize,
}

struct Winner {
    orig: usize,
    len: usize,
    dups: Vec<usize>,
    score: i64,
}

/// Seed matching: bucket every record-aligned window of [`MIN_MATCH`]
/// bytes by content, then extend each in-bucket pair for as long as the
/// bytes keep agreeing.
///
/// The content buckets replace a quadratic all-pairs window scan; only
/// offsets whose first window is byte-identical are ever compared.
fn find_matches(data: &[u8]) -> Vec<Match> {
    let mut buckets: HashMap<&[u8], Vec<usize>> = HashMap::new();

    let mut pos = 0;
    while pos + MIN_MATCH <= data.len() {
        buckets.entry(&data[pos..pos + MIN_MATCH]).or_default().push(pos);
        pos += RECORD_SIZE;
    }

    let mut matches = Vec::new();
    let mut offsets: Vec<&Vec<usize>> = buckets.values().filter(|v| v.len() > 1).collect();
    // bucket iteration order is arbitrary; sort for reproducible output
    offsets.sort_by_key(|v| v[0]);

    for bucket in offsets {
        for (a, &orig) in bucket.iter().enumerate() {
            for &dup in &bucket[a + 1..] {
                let mut len = MIN_MATCH;
                while dup + len < data.len() && data[orig + len] == data[dup + len] {
                    len += 1;
                }
                len &= !(RECORD_SIZE - 1);
                matches.push(Match { orig, dup, len });
            }
        }
    }

    matches
}

/// True when the span holds an instruction that must not move into a
/// callable block: control-flow enders, or calls (a run of pass-through
/// calls is not worth extracting).
fn span_is_extractable(data: &[u8], orig: usize, len: usize) -> bool {
    let mut pos = orig;
    while pos < orig + len {
        match data[pos] {
            opcodes::CALL_LONG | opcodes::CALL_SYMBOL | opcodes::CALL_SHORT => return false,
            opcodes::STOP | opcodes::JUMP | opcodes::RETURN => return false,
            _ => {}
        }
        pos += RECORD_SIZE;
    }
    true
}

/// Packed size the span would occupy, per the instruction-length table.
fn packed_span_size(
    data: &[u8],
    orig: usize,
    len: usize,
    dial: &SpeedDial,
) -> Result<usize, PipelineError> {
    let mut size = 0;
    let mut pos = orig;
    while pos < orig + len {
        let opcode = data[pos];
        let ext = data[pos + 1];
        match instruction_len(opcode, ext, Some(dial)) {
            0 => return Err(PipelineError::LengthUndeterminable { opcode, ext, pos }),
            n => size += n,
        }
        pos += RECORD_SIZE;
    }
    Ok(size)
}

fn ranges_overlap(a: usize, b: usize, len: usize) -> bool {
    a < b + len && b < a + len
}

/// Offsets some jump or call lands on. A span hiding one of these behind
/// a call would leave the jump pointing into a removed NOP slot.
fn jump_target_set(data: &[u8]) -> HashSet<usize> {
    let mut targets = HashSet::new();
    let mut pos = 0;
    while pos < data.len() {
        if data[pos] == opcodes::JUMP || data[pos] == opcodes::CALL_LONG {
            let addr = u32::from_le_bytes(data[pos + 1..pos + 5].try_into().unwrap());
            targets.insert(addr as usize);
        }
        pos += RECORD_SIZE;
    }
    targets
}

/// A target at the span start is fine (the replacement call sits exactly
/// there); anything past it would be NOP-filled away.
fn span_hides_target(targets: &HashSet<usize>, start: usize, len: usize) -> bool {
    let mut pos = start + RECORD_SIZE;
    while pos < start + len {
        if targets.contains(&pos) {
            return true;
        }
        pos += RECORD_SIZE;
    }
    false
}

fn best_match(
    data: &[u8],
    matches: &[Match],
    targets: &HashSet<usize>,
    dial: &SpeedDial,
) -> Result<Option<Winner>, PipelineError> {
    let mut by_origin: HashMap<usize, Vec<Match>> = HashMap::new();
    for m in matches {
        by_origin.entry(m.orig).or_default().push(*m);
    }

    let mut origins: Vec<usize> = by_origin.keys().copied().collect();
    origins.sort_unstable();

    let mut best: Option<Winner> = None;

    for orig in origins {
        let group = &by_origin[&orig];
        let max_len = group.iter().map(|m| m.len).max().unwrap_or(0);

        let mut len = MIN_MATCH;
        while len <= max_len {
            if !span_is_extractable(data, orig, len) || span_hides_target(targets, orig, len) {
                // longer spans contain this one
                break;
            }

            let mut dups: Vec<usize> = Vec::new();
            for m in group {
                if m.len < len {
                    continue;
                }
                // self-overlap with the origin span
                if ranges_overlap(orig, m.dup, len) {
                    continue;
                }
                if span_hides_target(targets, m.dup, len) {
                    continue;
                }
                // overlap with an earlier accepted duplicate: first wins
                if dups.iter().any(|&d| ranges_overlap(d, m.dup, len)) {
                    continue;
                }
                dups.push(m.dup);
            }

            if !dups.is_empty() {
                let block_size = packed_span_size(data, orig, len, dial)? as i64;
                let gain = (block_size - 3) * dups.len() as i64 - 4;
                let score = if gain <= 0 {
                    -1
                } else {
                    gain * 2 + len as i64 * 3
                };

                if score > 0 && best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(Winner {
                        orig,
                        len,
                        dups,
                        score,
                    });
                }
            }

            len += RECORD_SIZE;
        }
    }

    Ok(best)
}

/// One extraction iteration.
///
/// Finds the repeated record-aligned span with the highest byte-savings
/// score, factors it out into a new entry in `sub_blocks`, and replaces
/// every occurrence with a call-by-symbol record (NOP-filling the tail of
/// each span, then stripping the NOPs away).
///
/// Returns `None` when no profitable span exists, which terminates the
/// driver's extraction loop. The caller is responsible for placing the
/// new block and resolving the call-by-symbol records it left behind
/// before iterating again.
pub fn extract_sub_blocks(
    data: &[u8],
    sub_blocks: &mut Vec<SubBlock>,
    dial: &SpeedDial,
) -> Result<Option<Vec<u8>>, PipelineError> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(PipelineError::UnalignedStream { len: data.len() });
    }

    let matches = find_matches(data);
    let targets = jump_target_set(data);
    let winner = match best_match(data, &matches, &targets, dial)? {
        Some(w) => w,
        None => return Ok(None),
    };

    let mut block = data[winner.orig..winner.orig + winner.len].to_vec();
    block.push(opcodes::RETURN);
    block.resize(winner.len + RECORD_SIZE, 0);

    let id = sub_blocks.len() as u32;
    sub_blocks.push(SubBlock {
        data: block,
        offset: None,
    });

    let mut out = data.to_vec();
    for &site in std::iter::once(&winner.orig).chain(winner.dups.iter()) {
        let record = &mut out[site..site + RECORD_SIZE];
        record[0] = opcodes::CALL_SYMBOL;
        record[1..5].copy_from_slice(&id.to_le_bytes());
        record[5..].fill(0);

        let mut pos = site + RECORD_SIZE;
        while pos < site + winner.len {
            out[pos] = opcodes::NOP;
            out[pos + 1..pos + RECORD_SIZE].fill(0);
            pos += RECORD_SIZE;
        }
    }

    strip_nops_fixed(&out).map(Some)
}

/// Rewrite every call-by-symbol record into a real call using the placed
/// block offsets.
pub fn resolve_symbols(data: &mut [u8], sub_blocks: &[SubBlock]) -> Result<(), PipelineError> {
    let mut pos = 0;
    while pos < data.len() {
        if data[pos] == opcodes::CALL_SYMBOL {
            let id = u32::from_le_bytes(data[pos + 1..pos + 5].try_into().unwrap());
            let offset = match sub_blocks.get(id as usize).and_then(|b| b.offset) {
                Some(o) => o,
                None => {
                    return Err(PipelineError::UnresolvedSymbol {
                        id,
                        count: sub_blocks.len(),
                    })
                }
            };
            data[pos] = opcodes::CALL_LONG;
            data[pos + 1..pos + 5].copy_from_slice(&(offset as u32).to_le_bytes());
        }
        pos += RECORD_SIZE;
    }

    Ok(())
}
