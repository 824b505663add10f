//! A single location for all of the errors in the stream pipeline

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    // Stream walk hit an opcode whose encoded length cannot be determined.
    LengthUndeterminable { opcode: u8, ext: u8, pos: usize },

    // A record did not fit in the remaining bytes of the stream.
    TruncatedRecord { pos: usize },

    // A jump/call address is not a key in the pass's address table.
    UnmappedAddress { addr: u32, pos: usize },

    // A jump/call resolved to a NOP slot after stripping.
    NopTarget { addr: u32, pos: usize },

    // A jump/call address is past the end of the stream.
    OutOfRangeAddress { addr: u32, len: usize },

    // A call-by-symbol id with no matching sub-block.
    UnresolvedSymbol { id: u32, count: usize },

    // A short call reached the packer. Only the packer narrows calls,
    // so this indicates a broken earlier pass.
    ShortCallBeforePack { pos: usize },

    // A fixed-width stream whose length is not a record multiple.
    UnalignedStream { len: usize },
}

#[derive(Debug)]
pub enum ExportError {
    PipelineError(&'static str, PipelineError),

    NoChannels,
    TooManyChannels(usize),
}

// From Traits
// ===========

impl PipelineError {
    pub fn into_export(self, pass: &'static str) -> ExportError {
        ExportError::PipelineError(pass, self)
    }
}

// Display
// =======

impl Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LengthUndeterminable { opcode, ext, pos } => write!(
                f,
                "cannot determine length of instruction ${:02x} (ext ${:02x}) at ${:x}",
                opcode, ext, pos
            ),
            Self::TruncatedRecord { pos } => {
                write!(f, "truncated record at ${:x}", pos)
            }
            Self::UnmappedAddress { addr, pos } => {
                write!(f, "unmapped address ${:x} in record at ${:x}", addr, pos)
            }
            Self::NopTarget { addr, pos } => {
                write!(f, "address ${:x} in record at ${:x} targets a NOP", addr, pos)
            }
            Self::OutOfRangeAddress { addr, len } => {
                write!(f, "address ${:x} is outside the stream (len ${:x})", addr, len)
            }
            Self::UnresolvedSymbol { id, count } => {
                write!(f, "call-by-symbol {} but only {} sub-blocks exist", id, count)
            }
            Self::ShortCallBeforePack { pos } => {
                write!(f, "short call at ${:x} before the packing pass", pos)
            }
            Self::UnalignedStream { len } => {
                write!(f, "stream length ${:x} is not a record multiple", len)
            }
        }
    }
}

impl Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PipelineError(pass, e) => write!(f, "{} pass failed: {}", pass, e),
            Self::NoChannels => write!(f, "no channels to export"),
            Self::TooManyChannels(n) => write!(f, "too many channels: {}", n),
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for ExportError {}
