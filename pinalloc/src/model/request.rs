//! Feature requests declared by the user.

use serde::Serialize;

use super::peripheral::{PeripheralType, SubSignal, Symbol};

/// The channels a feature asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedSubSignals {
    /// Named channels that must match exactly, in request order.
    Explicit(Vec<Symbol>),
    /// `N` interchangeable channels, labelled `0..N`.
    Anonymous(u32),
}

impl RequestedSubSignals {
    pub fn len(&self) -> usize {
        match self {
            RequestedSubSignals::Explicit(symbols) => symbols.len(),
            RequestedSubSignals::Anonymous(count) => *count as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named logical requirement binding one peripheral type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRequest {
    pub name: String,
    pub peripheral: PeripheralType,
    pub sub_signals: RequestedSubSignals,
}

impl FeatureRequest {
    pub fn explicit(name: impl Into<String>, peripheral: PeripheralType, symbols: Vec<Symbol>) -> Self {
        Self {
            name: name.into(),
            peripheral,
            sub_signals: RequestedSubSignals::Explicit(symbols),
        }
    }

    pub fn anonymous(name: impl Into<String>, peripheral: PeripheralType, count: u32) -> Self {
        Self {
            name: name.into(),
            peripheral,
            sub_signals: RequestedSubSignals::Anonymous(count),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.sub_signals.len()
    }

    /// Report label of one slot: the symbol name, or the channel index.
    pub fn slot_label(&self, slot: usize) -> String {
        match &self.sub_signals {
            RequestedSubSignals::Explicit(symbols) => symbols
                .get(slot)
                .map(|s| s.name().to_string())
                .unwrap_or_default(),
            RequestedSubSignals::Anonymous(_) => slot.to_string(),
        }
    }

    /// Sub-signal a slot must match exactly, if any.
    pub fn slot_requirement(&self, slot: usize) -> Option<SubSignal> {
        match &self.sub_signals {
            RequestedSubSignals::Explicit(symbols) => symbols.get(slot).map(|s| SubSignal::Named(*s)),
            RequestedSubSignals::Anonymous(_) => None,
        }
    }
}

/// A declaration dropped during lenient parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDeclaration {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// Parsed contents of a feature declaration file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureSet {
    pub features: Vec<FeatureRequest>,
    pub skipped: Vec<SkippedDeclaration>,
}

impl FeatureSet {
    pub fn new(features: Vec<FeatureRequest>) -> Self {
        Self {
            features,
            skipped: Vec::new(),
        }
    }

    pub fn total_slots(&self) -> usize {
        self.features
            .iter()
            .fold(0, |total: usize, f| total.saturating_add(f.slot_count()))
    }
}
