// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use crate::*;

use cmdstream::export::{export_command_stream, ExportOptions};

fn all_off() -> ExportOptions {
    ExportOptions {
        speed_dial: false,
        condense_delays: false,
        extract_blocks: false,
    }
}

/// Opcodes of the packed body, for assertions.
fn body_opcodes(data: &[u8]) -> Vec<(usize, u8)> {
    let h = parse_header(data);
    let dial = dial_from_header(&h);
    packed_starts(&data[h.body_start..], &dial)
        .into_iter()
        .map(|p| (p + h.body_start, data[h.body_start + p]))
        .collect()
}

#[test]
fn no_loop_ends_every_channel_with_a_terminal() {
    let mut replayer = ScriptedReplayer::new(
        2,
        vec![
            vec![Command::note_on(0, 12), Command::note_on(1, 24)],
            vec![],
            vec![],
        ],
    );

    let data = export_command_stream(&mut replayer, &all_off()).unwrap();
    let h = parse_header(&data);
    assert_eq!(h.chans, 2);

    let ops = body_opcodes(&data);
    let stops: Vec<_> = ops.iter().filter(|(_, op)| *op == opcodes::STOP).collect();
    assert_eq!(stops.len(), 2);
    assert!(!ops.iter().any(|(_, op)| *op == opcodes::JUMP));
}

#[test]
fn looping_song_jumps_to_the_loop_tick() {
    let mut replayer = ScriptedReplayer::new(
        1,
        vec![
            vec![Command::note_on(0, 12)],
            vec![Command::note_on(0, 16)],
            vec![],
        ],
    )
    .with_loop(1);

    let data = export_command_stream(&mut replayer, &all_off()).unwrap();
    let h = parse_header(&data);
    let dial = dial_from_header(&h);

    let ops = body_opcodes(&data);
    let jumps: Vec<_> = ops.iter().filter(|(_, op)| *op == opcodes::JUMP).collect();
    assert_eq!(jumps.len(), 1);

    // the loop target must land on an instruction start
    let (jump_pos, _) = *jumps[0];
    let target = u32::from_le_bytes(data[jump_pos + 1..jump_pos + 5].try_into().unwrap()) as usize;
    let starts: Vec<usize> = packed_starts(&data[h.body_start..], &dial)
        .into_iter()
        .map(|p| p + h.body_start)
        .collect();
    assert!(starts.contains(&target));
    assert_ne!(data[target], opcodes::NOP);

    // the second note-on is inside the loop, after the target
    let note_pos = starts
        .iter()
        .copied()
        .find(|&p| data[p] == 16 + 60)
        .unwrap();
    assert!(target <= note_pos);
}

#[test]
fn channel_offsets_point_at_first_markers() {
    let mut replayer = ScriptedReplayer::new(
        3,
        vec![vec![
            Command::note_on(0, 0),
            Command::note_on(1, 4),
            Command::note_on(2, 7),
        ]],
    );

    let data = export_command_stream(&mut replayer, &ExportOptions::default()).unwrap();
    let h = parse_header(&data);

    for (chan, &off) in h.offsets.iter().enumerate() {
        assert_eq!(data[off], opcodes::MARKER);
        assert_eq!(data[off + 1] as usize, chan);
        assert_eq!(data[off + 2] & 1, 1);
    }
}

/// A command dominating the tally takes speed-dial slot 0, and every
/// occurrence shrinks to the one-byte alias.
#[test]
fn speed_dial_aliases_the_most_popular_command() {
    let mut ticks = Vec::new();
    for i in 0..1000 {
        ticks.push(vec![
            Command::new(CommandKind::FmTl, 0, (i & 0x7f) as i32, 1),
        ]);
    }
    for _ in 0..10 {
        ticks.push(vec![Command::new(CommandKind::WaveTable, 0, 1, 0)]);
    }

    let mut replayer = ScriptedReplayer::new(1, ticks);
    let options = ExportOptions {
        speed_dial: true,
        condense_delays: false,
        extract_blocks: false,
    };

    let data = export_command_stream(&mut replayer, &options).unwrap();
    let h = parse_header(&data);

    assert_eq!(h.cmds[0], CommandKind::FmTl as u8);
    assert_eq!(h.cmds[1], CommandKind::WaveTable as u8);

    let ops = body_opcodes(&data);
    let dialed = ops.iter().filter(|(_, op)| *op == 0xd0).count();
    assert_eq!(dialed, 1000);

    // no generic-prefix FmTl records remain
    assert!(!ops
        .iter()
        .any(|&(pos, op)| op == opcodes::CMD_PREFIX && data[pos + 1] == CommandKind::FmTl as u8));
}

/// A delay run longer than the short-repeat limit condenses into a
/// single long repeat.
#[test]
fn long_delay_runs_use_the_long_repeat_form() {
    let mut ticks = vec![vec![Command::note_on(0, 12)]];
    for _ in 0..300 {
        ticks.push(vec![]);
    }
    ticks.push(vec![Command::note_on(0, 14)]);

    let mut replayer = ScriptedReplayer::new(1, ticks);
    let options = ExportOptions {
        speed_dial: false,
        condense_delays: true,
        extract_blocks: false,
    };

    let data = export_command_stream(&mut replayer, &options).unwrap();

    let ops = body_opcodes(&data);
    let longs: Vec<_> = ops
        .iter()
        .filter(|(_, op)| *op == opcodes::WAIT_LONG)
        .collect();
    assert_eq!(longs.len(), 1);

    let (pos, _) = *longs[0];
    // 300 ticks of run, plus the note row's own tick delay
    let value = u16::from_le_bytes(data[pos + 1..pos + 3].try_into().unwrap());
    assert_eq!(value, 301);
}

#[test]
fn frequent_delay_runs_get_dial_slots() {
    // runs of 4 delays between notes, repeated often
    let mut ticks = Vec::new();
    for i in 0..20 {
        ticks.push(vec![Command::note_on(0, i)]);
        for _ in 0..3 {
            ticks.push(vec![]);
        }
    }

    let mut replayer = ScriptedReplayer::new(1, ticks);
    let options = ExportOptions {
        speed_dial: false,
        condense_delays: true,
        extract_blocks: false,
    };

    let data = export_command_stream(&mut replayer, &options).unwrap();
    let h = parse_header(&data);

    assert_eq!(h.delays[0], 4);

    let ops = body_opcodes(&data);
    let aliased = ops
        .iter()
        .filter(|(_, op)| *op == opcodes::SPEED_DIAL_DELAY_BASE)
        .count();
    assert!(aliased >= 19);
}

/// A loop tick landing inside a delay run must not be condensed away:
/// the run splits at the loop target so the jump still lands on a real
/// instruction.
#[test]
fn loop_target_inside_a_delay_run_survives_condensation() {
    let mut ticks = vec![vec![Command::note_on(0, 12)]];
    for _ in 0..8 {
        ticks.push(vec![]);
    }

    let mut replayer = ScriptedReplayer::new(1, ticks).with_loop(4);
    let options = ExportOptions {
        speed_dial: false,
        condense_delays: true,
        extract_blocks: false,
    };

    let data = export_command_stream(&mut replayer, &options).unwrap();
    let h = parse_header(&data);
    let dial = dial_from_header(&h);

    let starts: Vec<usize> = packed_starts(&data[h.body_start..], &dial)
        .into_iter()
        .map(|p| p + h.body_start)
        .collect();

    let jump_pos = starts
        .iter()
        .copied()
        .find(|&p| data[p] == opcodes::JUMP)
        .unwrap();
    let target = u32::from_le_bytes(data[jump_pos + 1..jump_pos + 5].try_into().unwrap()) as usize;

    assert!(starts.contains(&target));
    assert_ne!(data[target], opcodes::NOP);
}

/// The full pipeline: extraction on, phrases shared between channels.
#[test]
fn full_export_with_extraction_round_trips() {
    let phrase = |chan: usize, base: i32| {
        vec![
            Command::new(CommandKind::FmTl, chan, base, 1),
            Command::new(CommandKind::FmAr, chan, base + 1, 2),
            Command::new(CommandKind::FmDr, chan, base + 2, 3),
            Command::new(CommandKind::FmSl, chan, base + 3, 4),
        ]
    };

    let mut ticks = Vec::new();
    for rep in 0..6 {
        for cmd in phrase(0, 10) {
            ticks.push(vec![cmd]);
        }
        ticks.push(vec![Command::note_on(0, rep)]);
    }

    let mut replayer = ScriptedReplayer::new(1, ticks);
    let data = export_command_stream(&mut replayer, &ExportOptions::default()).unwrap();

    let h = parse_header(&data);
    let dial = dial_from_header(&h);

    // the whole body walks cleanly with the header's tables
    let starts = packed_starts(&data[h.body_start..], &dial);
    assert!(!starts.is_empty());

    // no unresolved or fixed-width-only records survive
    for &p in &starts {
        let op = data[h.body_start + p];
        assert_ne!(op, opcodes::CALL_SYMBOL);
        assert_ne!(op, opcodes::NOP);
    }
}

#[test]
fn no_channels_is_an_error() {
    let mut replayer = ScriptedReplayer::new(0, Vec::new());
    assert!(export_command_stream(&mut replayer, &all_off()).is_err());
}
