//! Pattern effect registry

// SPDX-FileCopyrightText: © 2026 the cmdstream authors
//
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EffectKind {
    Arpeggio,
    PortaUp,
    PortaDown,
    TonePorta,
    Vibrato,
    Panning,
    VolSlide,
    OrderJump,
    PatternBreak,
    Speed,
    TickRate,
    Stop,
}

#[derive(Debug, Copy, Clone)]
pub struct EffectDef {
    pub kind: EffectKind,
    pub name: &'static str,
}

/// Effect id to definition mapping, owned by the engine instance and
/// populated once at construction.
#[derive(Debug)]
pub struct EffectRegistry {
    defs: HashMap<u8, EffectDef>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        let mut defs = HashMap::new();
        let mut add = |id: u8, kind: EffectKind, name: &'static str| {
            defs.insert(id, EffectDef { kind, name });
        };

        add(0x00, EffectKind::Arpeggio, "Arpeggio");
        add(0x01, EffectKind::PortaUp, "Portamento up");
        add(0x02, EffectKind::PortaDown, "Portamento down");
        add(0x03, EffectKind::TonePorta, "Tone portamento");
        add(0x04, EffectKind::Vibrato, "Vibrato");
        add(0x08, EffectKind::Panning, "Set panning");
        add(0x0a, EffectKind::VolSlide, "Volume slide");
        add(0x0b, EffectKind::OrderJump, "Jump to order");
        add(0x0d, EffectKind::PatternBreak, "Pattern break");
        add(0x0f, EffectKind::Speed, "Set speed");
        add(0xf0, EffectKind::TickRate, "Set tick rate");
        add(0xff, EffectKind::Stop, "Stop song");

        Self { defs }
    }

    pub fn get(&self, id: u8) -> Option<&EffectDef> {
        self.defs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
