//! Classification of vendor signal names.
//!
//! A raw name such as `SPI1_NSS` is normalized through a small alias table,
//! matched against the peripheral-type prefixes, and decoded into an
//! instance number and a sub-signal.

use thiserror::Error;

use crate::model::{PeripheralType, PhysicalSignal, SubSignal, Symbol, EXTI_CHANNEL_OFFSET};

/// Vendor naming irregularities, applied in order before classification.
pub const SIGNAL_ALIASES: &[(&str, &str)] = &[
    ("NJTRST", "JTRST"),
    ("NSS", "CS"),
    ("JTDO-TRACESWO", "SWO"),
    ("JTMS-SWDIO", "SWDIO"),
    ("JTCK-SWCLK", "SWCLK"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("no known peripheral type prefix")]
    UnknownPeripheral,
    #[error("invalid instance number '{0}'")]
    BadInstance(String),
    #[error("missing sub-signal after '{0}'")]
    MissingSubSignal(PeripheralType),
    #[error("'{symbol}' is not a {peripheral} channel")]
    UnknownSymbol {
        peripheral: PeripheralType,
        symbol: String,
    },
    #[error("missing or invalid {0} channel number")]
    BadChannel(PeripheralType),
    #[error("{peripheral} channel {channel} collides with the external-trigger range")]
    ChannelOutOfRange {
        peripheral: PeripheralType,
        channel: u32,
    },
    #[error("pin name '{0}' does not encode a GPIO bank and number")]
    BadPinName(String),
}

/// Apply [`SIGNAL_ALIASES`] to a raw signal name.
pub fn normalize_signal_name(raw: &str) -> String {
    SIGNAL_ALIASES
        .iter()
        .fold(raw.to_string(), |name, (before, after)| name.replace(before, after))
}

/// Classify one raw signal found on the pin called `pin_name`.
pub fn classify_signal(pin_name: &str, raw: &str) -> Result<PhysicalSignal, SignalError> {
    let name = normalize_signal_name(raw);
    let peripheral = PeripheralType::ALL
        .iter()
        .copied()
        .find(|t| name.starts_with(t.name()))
        .ok_or(SignalError::UnknownPeripheral)?;
    let rest = &name[peripheral.name().len()..];

    let (instance, sub_signal) = match peripheral {
        PeripheralType::Gpio => gpio_coordinates(pin_name)?,
        PeripheralType::Adc => analog_channel(peripheral, rest, "IN")?,
        PeripheralType::Dac => analog_channel(peripheral, rest, "OUT")?,
        _ => symbolic_channel(peripheral, rest)?,
    };

    Ok(PhysicalSignal::new(raw, peripheral, instance, sub_signal))
}

/// Bank and number of a GPIO pin, from names like `PA5` or `PC14-OSC32_IN`.
pub fn gpio_coordinates(pin_name: &str) -> Result<(u32, SubSignal), SignalError> {
    let base: String = pin_name
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    let bad = || SignalError::BadPinName(pin_name.to_string());

    let mut chars = base.chars();
    if chars.next() != Some('P') {
        return Err(bad());
    }
    let bank = chars.next().filter(|c| c.is_ascii_uppercase()).ok_or_else(bad)?;
    let number: u32 = chars.as_str().parse().map_err(|_| bad())?;

    Ok((bank as u32 - 'A' as u32 + 1, SubSignal::Channel(number)))
}

/// Leading decimal instance number, defaulting to 1 when absent.
fn split_instance(rest: &str) -> Result<(u32, &str), SignalError> {
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return Ok((1, rest));
    }
    let digits = &rest[..end];
    match digits.parse::<u32>() {
        Ok(n) if n >= 1 => Ok((n, &rest[end..])),
        _ => Err(SignalError::BadInstance(digits.to_string())),
    }
}

fn leading_number(s: &str) -> Option<u32> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

fn analog_channel(
    peripheral: PeripheralType,
    rest: &str,
    marker: &str,
) -> Result<(u32, SubSignal), SignalError> {
    let (instance, tail) = split_instance(rest)?;

    if let Some((_, trigger)) = tail.split_once("EXTI") {
        let line = leading_number(trigger).ok_or(SignalError::BadChannel(peripheral))?;
        return Ok((instance, SubSignal::Channel(EXTI_CHANNEL_OFFSET + line)));
    }

    let (_, number) = tail
        .split_once(marker)
        .ok_or(SignalError::BadChannel(peripheral))?;
    let channel = number
        .parse::<u32>()
        .map_err(|_| SignalError::BadChannel(peripheral))?;
    if channel >= EXTI_CHANNEL_OFFSET {
        return Err(SignalError::ChannelOutOfRange {
            peripheral,
            channel,
        });
    }
    Ok((instance, SubSignal::Channel(channel)))
}

fn symbolic_channel(peripheral: PeripheralType, rest: &str) -> Result<(u32, SubSignal), SignalError> {
    let (instance, tail) = split_instance(rest)?;
    let (_, channel) = tail
        .split_once('_')
        .filter(|(_, channel)| !channel.is_empty())
        .ok_or(SignalError::MissingSubSignal(peripheral))?;
    let channel = channel.to_ascii_uppercase();

    let symbol = Symbol::lookup(peripheral, &channel).ok_or(SignalError::UnknownSymbol {
        peripheral,
        symbol: channel,
    })?;
    Ok((instance, SubSignal::Named(symbol)))
}
