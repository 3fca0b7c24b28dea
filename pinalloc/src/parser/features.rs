//! Feature declaration parser.
//!
//! One declaration per line:
//!
//! ```text
//! console uses USART(TX, RX)
//! status_leds uses GPIO(3)
//! ```
//!
//! Lines that do not have this shape are treated as comments and ignored.

use std::path::Path;
use thiserror::Error;

use crate::model::{FeatureRequest, FeatureSet, PeripheralType, SkippedDeclaration, Symbol};
use crate::parser::{IngestionError, SignalPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("unknown peripheral type '{0}'")]
    UnknownPeripheral(String),
    #[error("'{symbol}' is not a {peripheral} channel")]
    UnknownSymbol {
        peripheral: PeripheralType,
        symbol: String,
    },
    #[error("{0} only accepts a channel count")]
    SymbolsNotSupported(PeripheralType),
    #[error("missing channel list")]
    MissingArguments,
    #[error("invalid channel count '{0}'")]
    InvalidCount(String),
}

pub struct FeatureParser;

impl FeatureParser {
    pub fn parse_file(path: &Path, policy: SignalPolicy) -> Result<FeatureSet, IngestionError> {
        let content = std::fs::read_to_string(path).map_err(|source| IngestionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::parse_str(&content, policy)?;
        tracing::info!("Loaded {} feature declarations from {:?}", set.features.len(), path);
        Ok(set)
    }

    pub fn parse_str(text: &str, policy: SignalPolicy) -> Result<FeatureSet, IngestionError> {
        let mut set = FeatureSet::default();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            match parse_declaration(line) {
                None => {
                    if !line.trim().is_empty() {
                        tracing::debug!("Ignoring line {}: {}", line_number, line.trim());
                    }
                }
                Some(Ok(feature)) => set.features.push(feature),
                Some(Err(reason)) => match policy {
                    SignalPolicy::Strict => {
                        return Err(IngestionError::InvalidDeclaration {
                            line: line_number,
                            reason,
                        });
                    }
                    SignalPolicy::Lenient => {
                        tracing::warn!("Skipping declaration on line {}: {}", line_number, reason);
                        set.skipped.push(SkippedDeclaration {
                            line: line_number,
                            text: line.trim().to_string(),
                            reason: reason.to_string(),
                        });
                    }
                },
            }
        }

        Ok(set)
    }
}

/// `None` when the line is not a declaration at all; `Some(Err(_))` when it
/// is shaped like one but names an unknown type or channel.
pub fn parse_declaration(line: &str) -> Option<Result<FeatureRequest, DeclarationError>> {
    let line = line.trim();
    let (name, rest) = line.split_once(char::is_whitespace)?;
    if !is_identifier(name) {
        return None;
    }

    let rest = rest.trim_start().strip_prefix("uses")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (type_token, rest) = rest.split_once('(')?;
    let (args, _) = rest.split_once(')')?;

    let type_token = type_token.trim();
    if type_token.is_empty() || type_token.contains(char::is_whitespace) {
        return None;
    }

    Some(build_request(name, type_token, args.trim()))
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn build_request(name: &str, type_token: &str, args: &str) -> Result<FeatureRequest, DeclarationError> {
    let peripheral = PeripheralType::parse(type_token)
        .ok_or_else(|| DeclarationError::UnknownPeripheral(type_token.to_string()))?;

    if args.is_empty() {
        return Err(DeclarationError::MissingArguments);
    }

    if args.chars().all(|c| c.is_ascii_digit()) {
        let count: u32 = args
            .parse()
            .map_err(|_| DeclarationError::InvalidCount(args.to_string()))?;
        return Ok(FeatureRequest::anonymous(name, peripheral, count));
    }

    if peripheral.vocabulary().is_none() {
        return Err(DeclarationError::SymbolsNotSupported(peripheral));
    }

    let symbols = args
        .split(',')
        .map(|token| {
            let token = token.trim().to_ascii_uppercase();
            Symbol::lookup(peripheral, &token).ok_or(DeclarationError::UnknownSymbol {
                peripheral,
                symbol: token,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureRequest::explicit(name, peripheral, symbols))
}
