//! Command stream export driver

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::command::{CommandClass, FIRST_EXTENDED};
use crate::encoder::encode_command;
use crate::errors::{ExportError, PipelineError};
use crate::nopstrip::{strip_nops_fixed, strip_nops_packed};
use crate::opcode::{instruction_len_at, opcodes, SpeedDial};
use crate::pack::pack_stream;
use crate::reloc::{relocate_fixed, relocate_packed};
use crate::replay::Replayer;
use crate::subblock::{extract_sub_blocks, resolve_symbols, SubBlock};
use crate::writer::StreamWriter;
use crate::RECORD_SIZE;

use log::{debug, info, warn};

use std::collections::HashSet;

pub const FILE_MAGIC: &[u8; 4] = b"FCS\0";

/// Bounded by the short-call limit: the header must fit in the 16-bit
/// address headroom the packer leaves below 0x10000.
pub const MAX_CHANNELS: usize = 32;

const MARKER_FLAG_FIRST: u8 = 0x01;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub speed_dial: bool,
    pub condense_delays: bool,
    pub extract_blocks: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            speed_dial: true,
            condense_delays: true,
            extract_blocks: true,
        }
    }
}

fn write_record(w: &mut StreamWriter, bytes: &[u8]) {
    debug_assert!(bytes.len() <= RECORD_SIZE);
    w.write_bytes(bytes);
    w.pad_to(RECORD_SIZE);
}

/// Top-16 selection over a histogram, highest count first; ties keep the
/// lowest id.
fn top16(histogram: &[u32; 256], first: usize) -> [u8; 16] {
    let mut hist = *histogram;
    let mut out = [0u8; 16];

    for slot in out.iter_mut() {
        let mut cand: Option<usize> = None;
        for (i, &count) in hist.iter().enumerate().skip(first) {
            if count > 0 && cand.map_or(true, |c| count > hist[c]) {
                cand = Some(i);
            }
        }
        match cand {
            Some(c) => {
                *slot = c as u8;
                hist[c] = 0;
            }
            None => break,
        }
    }

    out
}

/// Rewrite generic-prefix records of the 16 most popular commands into
/// their 1-byte speed-dial aliases. The record stride is unchanged; the
/// payload shifts left one byte.
fn substitute_speed_dial(data: &mut [u8], dial: &SpeedDial) {
    let mut pos = 0;
    while pos < data.len() {
        if data[pos] == opcodes::CMD_PREFIX {
            if let Some(slot) = dial.cmd_slot(data[pos + 1]) {
                data[pos] = opcodes::SPEED_DIAL_CMD_BASE + slot as u8;
                data.copy_within(pos + 2..pos + RECORD_SIZE, pos + 1);
                data[pos + RECORD_SIZE - 1] = 0;
            }
        }
        pos += RECORD_SIZE;
    }
}

/// Record offsets targeted by a jump in this (channel-local) stream.
fn jump_targets(data: &[u8]) -> HashSet<usize> {
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

/// Runs of consecutive single-tick delay records, as (record index,
/// record count), split at jump targets so a loop record can never end up
/// pointing into the middle of a merged run.
fn delay_runs(data: &[u8], targets: &HashSet<usize>) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut run: Option<(usize, usize)> = None;

    for r in 0..data.len() / RECORD_SIZE {
        let pos = r * RECORD_SIZE;
        if data[pos] == opcodes::WAIT_ONE {
            match run {
                Some((start, n)) if !targets.contains(&pos) => run = Some((start, n + 1)),
                _ => {
                    if let Some(prev) = run.take() {
                        runs.push(prev);
                    }
                    run = Some((r, 1));
                }
            }
        } else if let Some(prev) = run.take() {
            runs.push(prev);
        }
    }
    if let Some(r) = run {
        runs.push(r);
    }

    runs
}

/// Replace a run of `n` single-tick delays with the smallest repeat
/// encoding, NOP-filling the rest of the run's record slots.
fn condense_run(data: &mut [u8], start: usize, n: usize, dial: &SpeedDial) {
    let mut rec = start;
    let mut remaining = n;

    while remaining > 0 {
        let chunk = remaining.min(0xffff);
        let pos = rec * RECORD_SIZE;

        data[pos..pos + RECORD_SIZE].fill(0);
        if chunk == 1 {
            data[pos] = opcodes::WAIT_ONE;
        } else if chunk <= 255 {
            match dial.delay_slot(chunk as u8) {
                Some(slot) => data[pos] = opcodes::SPEED_DIAL_DELAY_BASE + slot as u8,
                None => {
                    data[pos] = opcodes::WAIT_SHORT;
                    data[pos + 1] = chunk as u8;
                }
            }
        } else {
            data[pos] = opcodes::WAIT_LONG;
            data[pos + 1..pos + 3].copy_from_slice(&(chunk as u16).to_le_bytes());
        }

        rec += 1;
        remaining -= chunk;
    }

    for r in rec..start + n {
        let pos = r * RECORD_SIZE;
        data[pos..pos + RECORD_SIZE].fill(0);
        data[pos] = opcodes::NOP;
    }
}

/// Final packed-stream offset of every channel's first marker record.
fn find_channel_offsets(
    data: &[u8],
    chans: usize,
    dial: &SpeedDial,
) -> Result<Vec<u32>, PipelineError> {
    let mut offsets: Vec<Option<u32>> = vec![None; chans];

    let mut pos = 0;
    while pos < data.len() {
        let len = instruction_len_at(data, pos, Some(dial))?;
        if data[pos] == opcodes::MARKER {
            let chan = data[pos + 1] as usize;
            if data[pos + 2] & MARKER_FLAG_FIRST != 0 && chan < chans && offsets[chan].is_none() {
                offsets[chan] = Some(pos as u32);
            }
        }
        pos += len;
    }

    Ok(offsets
        .into_iter()
        .enumerate()
        .map(|(i, o)| match o {
            Some(o) => o,
            None => {
                warn!("channel {} has no start marker!", i);
                0
            }
        })
        .collect())
}

/// Replay the song headless and link its playback events into one
/// self-contained command stream binary.
pub fn export_command_stream<R: Replayer>(
    engine: &mut R,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let chans = engine.channel_count();
    if chans == 0 {
        return Err(ExportError::NoChannels);
    }
    if chans > MAX_CHANNELS {
        return Err(ExportError::TooManyChannels(chans));
    }

    // capture
    let loop_pos = engine.loop_point();
    match loop_pos {
        Some(lp) => info!("loop point: {} {}", lp.order, lp.row),
        None => info!("no loop point"),
    }

    engine.play_from_start();

    let mut chan_streams: Vec<StreamWriter> = Vec::with_capacity(chans);
    let mut tick_pos: Vec<Vec<usize>> = vec![Vec::new(); chans];
    for i in 0..chans {
        let mut w = StreamWriter::new();
        write_record(&mut w, &[opcodes::MARKER, i as u8, MARKER_FLAG_FIRST, 0]);
        chan_streams.push(w);
    }

    let mut cmd_popularity = [0u32; 256];
    let mut loop_tick: Option<usize> = None;
    let mut cur_rate = engine.tick_rate();
    let mut commands = Vec::new();
    let mut tick = 0usize;

    loop {
        for (i, w) in chan_streams.iter().enumerate() {
            tick_pos[i].push(w.tell());
        }

        if loop_tick.is_none() {
            if let Some(lp) = loop_pos {
                if engine.position() == lp && engine.on_row_boundary() {
                    info!("loop is on tick {}", tick);
                    loop_tick = Some(tick);
                }
            }
        }

        commands.clear();
        let done = engine.next_tick(&mut commands);
        if done {
            break;
        }

        let rate = engine.tick_rate();
        if rate != cur_rate {
            cur_rate = rate;
            let mut record = [0u8; 5];
            record[0] = opcodes::RATE;
            record[1..5].copy_from_slice(&((rate * 65536.0) as u32).to_le_bytes());
            write_record(&mut chan_streams[0], &record);
        }

        for cmd in &commands {
            if cmd.kind.def().class == CommandClass::Internal {
                continue;
            }
            if cmd.kind.is_extended() {
                cmd_popularity[cmd.kind.id() as usize] += 1;
            }
            if cmd.chan < chans {
                encode_command(&mut chan_streams[cmd.chan], cmd);
            }
        }

        for w in chan_streams.iter_mut() {
            write_record(w, &[opcodes::WAIT_ONE]);
        }

        tick += 1;
    }
    debug!("captured {} ticks", tick);

    match loop_tick {
        None => {
            for w in chan_streams.iter_mut() {
                write_record(w, &[opcodes::STOP]);
            }
        }
        Some(lt) => {
            for (i, w) in chan_streams.iter_mut().enumerate() {
                if tick_pos[i].len() > lt {
                    let addr = tick_pos[i][lt] as u32;
                    debug!("chan {} loop addr: {:x}", i, addr);
                    let mut record = [0u8; 5];
                    record[0] = opcodes::JUMP;
                    record[1..5].copy_from_slice(&addr.to_le_bytes());
                    write_record(w, &record);
                } else {
                    warn!("chan {} unable to find loop addr!", i);
                    write_record(w, &[opcodes::STOP]);
                }
            }
        }
    }

    let mut chan_data: Vec<Vec<u8>> = chan_streams.into_iter().map(|w| w.into_vec()).collect();

    // speed dial table + substitution
    let mut dial = SpeedDial::default();
    if options.speed_dial {
        dial.cmds = top16(&cmd_popularity, FIRST_EXTENDED as usize);
        for data in chan_data.iter_mut() {
            substitute_speed_dial(data, &dial);
        }
    }

    // delay condensation
    if options.condense_delays {
        let runs: Vec<Vec<(usize, usize)>> = chan_data
            .iter()
            .map(|data| delay_runs(data, &jump_targets(data)))
            .collect();

        let mut delay_popularity = [0u32; 256];
        for chan_runs in &runs {
            for &(_, n) in chan_runs {
                if (2..=255).contains(&n) {
                    delay_popularity[n] += 1;
                }
            }
        }
        dial.delays = top16(&delay_popularity, 0);

        for (data, chan_runs) in chan_data.iter_mut().zip(&runs) {
            for &(start, n) in chan_runs {
                if n >= 2 {
                    condense_run(data, start, n, &dial);
                }
            }
        }
    }

    // per-channel NOP removal
    for data in chan_data.iter_mut() {
        *data = strip_nops_fixed(data).map_err(|e| e.into_export("nop strip"))?;
    }

    // concatenation
    let mut stream = Vec::new();
    for (i, mut data) in chan_data.into_iter().enumerate() {
        let base = stream.len();
        debug!("chan {}: off {:x} size {:x}", i, base, data.len());
        relocate_fixed(&mut data, 0, base).map_err(|e| e.into_export("concat"))?;
        stream.extend_from_slice(&data);
    }

    // sub-block extraction
    let mut sub_blocks: Vec<SubBlock> = Vec::new();
    if options.extract_blocks {
        loop {
            let before = sub_blocks.len();
            match extract_sub_blocks(&stream, &mut sub_blocks, &dial)
                .map_err(|e| e.into_export("sub-block"))?
            {
                None => break,
                Some(next) => stream = next,
            }

            for block in sub_blocks[before..].iter_mut() {
                block.offset = Some(stream.len());
                stream.extend_from_slice(&block.data);
            }
            resolve_symbols(&mut stream, &sub_blocks)
                .map_err(|e| e.into_export("sub-block"))?;
        }
        info!("extracted {} sub-blocks", sub_blocks.len());
    }

    // packing
    let mut packed = pack_stream(&stream, &dial).map_err(|e| e.into_export("pack"))?;

    // final NOP removal (call-narrowing fillers)
    packed = strip_nops_packed(&packed, &dial).map_err(|e| e.into_export("packed strip"))?;

    // offset discovery
    let header_size = 4 + 4 + 4 * chans + 32;
    let offsets =
        find_channel_offsets(&packed, chans, &dial).map_err(|e| e.into_export("offsets"))?;

    // final relocation + emission
    relocate_packed(&mut packed, 0, header_size, &dial)
        .map_err(|e| e.into_export("final reloc"))?;

    let mut w = StreamWriter::new();
    w.write_bytes(FILE_MAGIC);
    w.write_u32(chans as u32);
    for (i, off) in offsets.iter().enumerate() {
        let off = off + header_size as u32;
        info!("- {}: off {:x}", i, off);
        w.write_u32(off);
    }
    w.write_bytes(&dial.delays);
    w.write_bytes(&dial.cmds);
    debug_assert!(w.len() == header_size);
    w.write_bytes(&packed);

    Ok(w.into_vec())
}
