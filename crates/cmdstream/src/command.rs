//! Playback event model and the per-command operand description table

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

/// Sentinel note value: a note-on with no pitch attached.
pub const NOTE_NULL: i32 = i32::MIN;

/// First command id eligible for speed-dial aliasing.
///
/// Ids below this value are either hint-aliased (one-byte opcode) or
/// internal, and are never carried behind the `0xF7` prefix popularity
/// tally.
pub const FIRST_EXTENDED: u8 = CommandKind::SampleMode as u8;

/// One playback event, as produced by the engine's replay loop.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub chan: usize,
    pub value: i32,
    pub value2: i32,
}

impl Command {
    pub fn new(kind: CommandKind, chan: usize, value: i32, value2: i32) -> Self {
        Self {
            kind,
            chan,
            value,
            value2,
        }
    }

    pub fn note_on(chan: usize, note: i32) -> Self {
        Self::new(CommandKind::NoteOn, chan, note, 0)
    }
}

/// Command identifiers.
///
/// The discriminant is the wire id: ids `0x01..=0x1b` encode as a single
/// hinted opcode byte (`0xb4 + id`), ids from [`FIRST_EXTENDED`] up encode
/// behind the generic `0xf7` prefix and may be speed-dial aliased.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    NoteOn = 0,
    NoteOff = 1,
    NoteOffEnv = 2,
    EnvRelease = 3,
    Instrument = 4,
    // ids 5-9 and 11 are per-tick products of the hints below.
    // The capture step strips them; they are never encoded.
    Volume = 5,
    GetVolume = 6,
    NotePorta = 7,
    Pitch = 8,
    PreNote = 9,
    Panning = 10,
    Legato = 11,
    PrePorta = 12,
    HintVibrato = 14,
    HintVibratoRange = 15,
    HintVibratoShape = 16,
    HintPitch = 17,
    HintArpeggio = 18,
    HintVolume = 19,
    HintVolSlide = 20,
    HintPorta = 21,
    HintLegato = 22,
    HintVolSlideTarget = 23,
    HintPanning = 27,

    SampleMode = 28,
    SampleFreq = 29,
    SampleBank = 30,
    SamplePos = 31,
    SampleDir = 32,
    WaveTable = 33,
    StdNoiseFreq = 34,
    StdNoiseMode = 35,
    FmHardReset = 36,
    FmLfo = 37,
    FmLfoWave = 38,
    FmFeedback = 39,
    FmExtCh = 40,
    FmAmDepth = 41,
    FmPmDepth = 42,
    FmTl = 43,
    FmAm = 44,
    FmAr = 45,
    FmDr = 46,
    FmSl = 47,
    FmRr = 48,
    FmMult = 49,
    FmWs = 50,
    FmSsg = 51,
    FmFixFreq = 52,
    GbSweepTime = 53,
    GbSweepDir = 54,
    NesDmc = 55,
    NesSweep = 56,
    NesEnvMode = 57,
    C64Cutoff = 58,
    C64Resonance = 59,
    C64FilterMode = 60,
    C64FineDuty = 61,
    C64FineCutoff = 62,
    AyEnvelopeSet = 63,
    AyEnvelopeLow = 64,
    AyEnvelopeHigh = 65,
    AyAutoEnvelope = 66,
    AyIoWrite = 67,
    AyAutoPwm = 68,
    FdsModDepth = 69,
    FdsModHigh = 70,
    FdsModLow = 71,
    FdsModPos = 72,
    FdsModWave = 73,
    LynxLfsrLoad = 74,
    SurroundPanning = 75,
    MacroOff = 76,
    MacroOn = 77,
    MacroRestart = 78,
    HintArpTime = 79,
    ExternalCommand = 80,
}

/// Wire shape of a command's operand payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OperandShape {
    None,
    /// One unsigned byte (`value`).
    Byte,
    /// Two unsigned bytes (`value`, `value2`).
    BytePair,
    /// One little-endian i16 (`value`).
    Short,
    /// Two little-endian i16s (`value`, `value2`).
    ShortPair,
    /// One little-endian u16 (`value`).
    UShort,
    /// One little-endian u32 (`value`).
    Word,
    /// `value`/`value2` booleans folded into bits 7/6 of one byte.
    PortaFlags,
    /// Block in bits 15-12, f-num in bits 10-0, one little-endian u16.
    FixedFreq,
    /// Enable bit 3 plus `value2 & 0x77`, one byte.
    SweepFlags,
}

impl OperandShape {
    /// Encoded operand length in bytes (opcode/prefix bytes excluded).
    pub fn encoded_len(self) -> usize {
        match self {
            Self::None => 0,
            Self::Byte | Self::PortaFlags | Self::SweepFlags => 1,
            Self::BytePair | Self::Short | Self::UShort | Self::FixedFreq => 2,
            Self::ShortPair | Self::Word => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandClass {
    /// Hint-aliased: one opcode byte in the `0xb4..=0xcf` range.
    Common,
    /// Behind the generic `0xf7` prefix, speed-dial eligible.
    Extended,
    /// Derived per-tick state the capture step strips. Never encoded.
    Internal,
}

/// Static description of a command's wire form.
///
/// This table is the single source of truth for operand shapes: the
/// encoder writes through it and the instruction-length table reads
/// through it, so the two cannot fall out of sync.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CommandDef {
    pub class: CommandClass,
    pub shape: OperandShape,
}

impl CommandKind {
    pub const ALL: [CommandKind; 77] = [
        CommandKind::NoteOn,
        CommandKind::NoteOff,
        CommandKind::NoteOffEnv,
        CommandKind::EnvRelease,
        CommandKind::Instrument,
        CommandKind::Volume,
        CommandKind::GetVolume,
        CommandKind::NotePorta,
        CommandKind::Pitch,
        CommandKind::PreNote,
        CommandKind::Panning,
        CommandKind::Legato,
        CommandKind::PrePorta,
        CommandKind::HintVibrato,
        CommandKind::HintVibratoRange,
        CommandKind::HintVibratoShape,
        CommandKind::HintPitch,
        CommandKind::HintArpeggio,
        CommandKind::HintVolume,
        CommandKind::HintVolSlide,
        CommandKind::HintPorta,
        CommandKind::HintLegato,
        CommandKind::HintVolSlideTarget,
        CommandKind::HintPanning,
        CommandKind::SampleMode,
        CommandKind::SampleFreq,
        CommandKind::SampleBank,
        CommandKind::SamplePos,
        CommandKind::SampleDir,
        CommandKind::WaveTable,
        CommandKind::StdNoiseFreq,
        CommandKind::StdNoiseMode,
        CommandKind::FmHardReset,
        CommandKind::FmLfo,
        CommandKind::FmLfoWave,
        CommandKind::FmFeedback,
        CommandKind::FmExtCh,
        CommandKind::FmAmDepth,
        CommandKind::FmPmDepth,
        CommandKind::FmTl,
        CommandKind::FmAm,
        CommandKind::FmAr,
        CommandKind::FmDr,
        CommandKind::FmSl,
        CommandKind::FmRr,
        CommandKind::FmMult,
        CommandKind::FmWs,
        CommandKind::FmSsg,
        CommandKind::FmFixFreq,
        CommandKind::GbSweepTime,
        CommandKind::GbSweepDir,
        CommandKind::NesDmc,
        CommandKind::NesSweep,
        CommandKind::NesEnvMode,
        CommandKind::C64Cutoff,
        CommandKind::C64Resonance,
        CommandKind::C64FilterMode,
        CommandKind::C64FineDuty,
        CommandKind::C64FineCutoff,
        CommandKind::AyEnvelopeSet,
        CommandKind::AyEnvelopeLow,
        CommandKind::AyEnvelopeHigh,
        CommandKind::AyAutoEnvelope,
        CommandKind::AyIoWrite,
        CommandKind::AyAutoPwm,
        CommandKind::FdsModDepth,
        CommandKind::FdsModHigh,
        CommandKind::FdsModLow,
        CommandKind::FdsModPos,
        CommandKind::FdsModWave,
        CommandKind::LynxLfsrLoad,
        CommandKind::SurroundPanning,
        CommandKind::MacroOff,
        CommandKind::MacroOn,
        CommandKind::MacroRestart,
        CommandKind::HintArpTime,
        CommandKind::ExternalCommand,
    ];

    pub fn from_u8(id: u8) -> Option<CommandKind> {
        Self::ALL.iter().copied().find(|c| *c as u8 == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn is_extended(self) -> bool {
        self.id() >= FIRST_EXTENDED
    }

    pub fn def(self) -> CommandDef {
        use CommandClass::{Common, Extended, Internal};
        use OperandShape as S;

        let (class, shape) = match self {
            Self::NoteOn => (Common, S::None),
            Self::NoteOff | Self::NoteOffEnv | Self::EnvRelease => (Common, S::None),

            Self::Volume
            | Self::GetVolume
            | Self::NotePorta
            | Self::Pitch
            | Self::PreNote
            | Self::Legato => (Internal, S::None),

            Self::Instrument
            | Self::HintVibratoRange
            | Self::HintVibratoShape
            | Self::HintPitch
            | Self::HintVolume
            | Self::HintLegato => (Common, S::Byte),

            Self::Panning
            | Self::HintVibrato
            | Self::HintArpeggio
            | Self::HintPorta
            | Self::HintPanning => (Common, S::BytePair),

            Self::PrePorta => (Common, S::PortaFlags),
            Self::HintVolSlide => (Common, S::Short),
            Self::HintVolSlideTarget => (Common, S::ShortPair),

            Self::SampleMode
            | Self::SampleFreq
            | Self::SampleBank
            | Self::SampleDir
            | Self::WaveTable
            | Self::StdNoiseFreq
            | Self::StdNoiseMode
            | Self::FmHardReset
            | Self::FmLfo
            | Self::FmLfoWave
            | Self::FmFeedback
            | Self::FmExtCh
            | Self::FmAmDepth
            | Self::FmPmDepth
            | Self::GbSweepTime
            | Self::GbSweepDir
            | Self::NesDmc
            | Self::NesEnvMode
            | Self::C64Cutoff
            | Self::C64Resonance
            | Self::C64FilterMode
            | Self::AyEnvelopeSet
            | Self::AyEnvelopeLow
            | Self::AyEnvelopeHigh
            | Self::AyAutoEnvelope
            | Self::FdsModDepth
            | Self::FdsModHigh
            | Self::FdsModLow
            | Self::FdsModPos
            | Self::FdsModWave
            | Self::MacroOff
            | Self::MacroOn
            | Self::MacroRestart
            | Self::HintArpTime
            | Self::ExternalCommand => (Extended, S::Byte),

            Self::FmTl
            | Self::FmAm
            | Self::FmAr
            | Self::FmDr
            | Self::FmSl
            | Self::FmRr
            | Self::FmMult
            | Self::FmWs
            | Self::FmSsg
            | Self::AyIoWrite
            | Self::AyAutoPwm
            | Self::SurroundPanning => (Extended, S::BytePair),

            Self::C64FineDuty | Self::C64FineCutoff | Self::LynxLfsrLoad => (Extended, S::UShort),

            Self::SamplePos => (Extended, S::Word),
            Self::FmFixFreq => (Extended, S::FixedFreq),
            Self::NesSweep => (Extended, S::SweepFlags),
        };

        CommandDef { class, shape }
    }
}
