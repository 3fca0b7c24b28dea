//! Peripheral types and their symbolic channel vocabularies.
//!
//! Every peripheral type either carries a fixed vocabulary of named channels
//! (`USART` has `TX`, `RX`, ...) or is addressed purely by channel number
//! (`GPIO`, `ADC`, `DAC`). The mapping is a static table checked at compile
//! time; nothing here resolves names at runtime beyond a `match`.

use serde::{Serialize, Serializer};
use std::fmt;

/// Offset applied to external-trigger channels of analog peripherals so they
/// never collide with ordinary input/output channel numbers.
pub const EXTI_CHANNEL_OFFSET: u32 = 64;

/// Category of hardware function a pin can carry.
///
/// Declaration order is significant: it is the order in which signal name
/// prefixes are tried during classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeripheralType {
    Sys,
    Rcc,
    Gpio,
    Tim,
    Rtc,
    Usart,
    I2c,
    Spi,
    Can,
    Usb,
    I2s,
    Ir,
    Adc,
    Dac,
    Comp,
    Opamp,
}

/// Peripheral types exempt from the cross-feature distinct-instance rule.
pub const EXCLUSIVITY_SET: [PeripheralType; 3] =
    [PeripheralType::Gpio, PeripheralType::Adc, PeripheralType::Dac];

impl PeripheralType {
    pub const ALL: [PeripheralType; 16] = [
        PeripheralType::Sys,
        PeripheralType::Rcc,
        PeripheralType::Gpio,
        PeripheralType::Tim,
        PeripheralType::Rtc,
        PeripheralType::Usart,
        PeripheralType::I2c,
        PeripheralType::Spi,
        PeripheralType::Can,
        PeripheralType::Usb,
        PeripheralType::I2s,
        PeripheralType::Ir,
        PeripheralType::Adc,
        PeripheralType::Dac,
        PeripheralType::Comp,
        PeripheralType::Opamp,
    ];

    /// Canonical upper-case name, as used in vendor signal names.
    pub fn name(self) -> &'static str {
        match self {
            PeripheralType::Sys => "SYS",
            PeripheralType::Rcc => "RCC",
            PeripheralType::Gpio => "GPIO",
            PeripheralType::Tim => "TIM",
            PeripheralType::Rtc => "RTC",
            PeripheralType::Usart => "USART",
            PeripheralType::I2c => "I2C",
            PeripheralType::Spi => "SPI",
            PeripheralType::Can => "CAN",
            PeripheralType::Usb => "USB",
            PeripheralType::I2s => "I2S",
            PeripheralType::Ir => "IR",
            PeripheralType::Adc => "ADC",
            PeripheralType::Dac => "DAC",
            PeripheralType::Comp => "COMP",
            PeripheralType::Opamp => "OPAMP",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(token))
    }

    /// Whether several features may share one instance of this type.
    pub fn in_exclusivity_set(self) -> bool {
        EXCLUSIVITY_SET.contains(&self)
    }

    /// Symbolic channels this type can be asked for, or `None` for types
    /// addressed only by channel number.
    pub fn vocabulary(self) -> Option<&'static [Symbol]> {
        match self {
            PeripheralType::Sys => Some(SysSignal::SYMBOLS),
            PeripheralType::Rcc => Some(RccSignal::SYMBOLS),
            PeripheralType::Tim => Some(TimSignal::SYMBOLS),
            PeripheralType::Rtc => Some(RtcSignal::SYMBOLS),
            PeripheralType::Usart => Some(UsartSignal::SYMBOLS),
            PeripheralType::I2c => Some(I2cSignal::SYMBOLS),
            PeripheralType::Spi => Some(SpiSignal::SYMBOLS),
            PeripheralType::Can => Some(CanSignal::SYMBOLS),
            PeripheralType::Usb => Some(UsbSignal::SYMBOLS),
            PeripheralType::I2s => Some(I2sSignal::SYMBOLS),
            PeripheralType::Ir => Some(IrSignal::SYMBOLS),
            PeripheralType::Comp => Some(CompSignal::SYMBOLS),
            PeripheralType::Opamp => Some(OpampSignal::SYMBOLS),
            PeripheralType::Gpio | PeripheralType::Adc | PeripheralType::Dac => None,
        }
    }

    /// Human label for one instance, e.g. `USART2` or `GPIOB`.
    pub fn instance_label(self, instance: u32) -> String {
        match self {
            PeripheralType::Gpio if (1..=26).contains(&instance) => {
                let letter = char::from(b'A' + (instance - 1) as u8);
                format!("GPIO{}", letter)
            }
            _ => format!("{}{}", self.name(), instance),
        }
    }
}

impl fmt::Display for PeripheralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident => $wrap:ident { $($variant:ident = $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const SYMBOLS: &'static [Symbol] = &[$(Symbol::$wrap($name::$variant)),+];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

vocabulary!(
    /// Debug, trace and wake-up pins.
    SysSignal => Sys {
        Wkup1 = "WKUP1",
        Swdio = "SWDIO",
        Swclk = "SWCLK",
        Swo = "SWO",
        Jtms = "JTMS",
        Jtck = "JTCK",
        Jtdi = "JTDI",
        Jtdo = "JTDO",
        Jtrst = "JTRST",
    }
);

vocabulary!(
    RccSignal => Rcc {
        OscIn = "OSC_IN",
        OscOut = "OSC_OUT",
        Mco = "MCO",
    }
);

vocabulary!(
    /// Timer capture/compare, complementary, break and external trigger lines.
    TimSignal => Tim {
        Ch1 = "CH1",
        Ch2 = "CH2",
        Ch3 = "CH3",
        Ch4 = "CH4",
        Ch5 = "CH5",
        Ch6 = "CH6",
        Ch1n = "CH1N",
        Ch2n = "CH2N",
        Ch3n = "CH3N",
        Ch4n = "CH4N",
        Bkin = "BKIN",
        Bkin2 = "BKIN2",
        Etr = "ETR",
    }
);

vocabulary!(
    RtcSignal => Rtc {
        Tamp2 = "TAMP2",
        Refin = "REFIN",
    }
);

vocabulary!(
    UsartSignal => Usart {
        Tx = "TX",
        Rx = "RX",
        Cts = "CTS",
        Rts = "RTS",
        Ck = "CK",
        De = "DE",
    }
);

vocabulary!(
    I2cSignal => I2c {
        Sda = "SDA",
        Scl = "SCL",
        Smba = "SMBA",
    }
);

vocabulary!(
    /// `NSS` in vendor documents is normalized to `CS` before lookup.
    SpiSignal => Spi {
        Mosi = "MOSI",
        Miso = "MISO",
        Sck = "SCK",
        Cs = "CS",
    }
);

vocabulary!(
    CanSignal => Can {
        Tx = "TX",
        Rx = "RX",
    }
);

vocabulary!(
    UsbSignal => Usb {
        Dm = "DM",
        Dp = "DP",
    }
);

vocabulary!(
    I2sSignal => I2s {
        Ckin = "CKIN",
        Sd = "SD",
        ExtSd = "EXT_SD",
        Ws = "WS",
        Ck = "CK",
        Mck = "MCK",
    }
);

vocabulary!(
    IrSignal => Ir {
        Out = "OUT",
    }
);

vocabulary!(
    CompSignal => Comp {
        Inm = "INM",
        Inp = "INP",
        Out = "OUT",
    }
);

vocabulary!(
    OpampSignal => Opamp {
        Vinm = "VINM",
        Vinp = "VINP",
        VinmSec = "VINM_SEC",
        VinpSec = "VINP_SEC",
        Vout = "VOUT",
    }
);

/// A named channel of one specific peripheral type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Sys(SysSignal),
    Rcc(RccSignal),
    Tim(TimSignal),
    Rtc(RtcSignal),
    Usart(UsartSignal),
    I2c(I2cSignal),
    Spi(SpiSignal),
    Can(CanSignal),
    Usb(UsbSignal),
    I2s(I2sSignal),
    Ir(IrSignal),
    Comp(CompSignal),
    Opamp(OpampSignal),
}

impl Symbol {
    /// Look up an upper-case channel name in the vocabulary of `peripheral`.
    pub fn lookup(peripheral: PeripheralType, name: &str) -> Option<Symbol> {
        match peripheral {
            PeripheralType::Sys => SysSignal::from_name(name).map(Symbol::Sys),
            PeripheralType::Rcc => RccSignal::from_name(name).map(Symbol::Rcc),
            PeripheralType::Tim => TimSignal::from_name(name).map(Symbol::Tim),
            PeripheralType::Rtc => RtcSignal::from_name(name).map(Symbol::Rtc),
            PeripheralType::Usart => UsartSignal::from_name(name).map(Symbol::Usart),
            PeripheralType::I2c => I2cSignal::from_name(name).map(Symbol::I2c),
            PeripheralType::Spi => SpiSignal::from_name(name).map(Symbol::Spi),
            PeripheralType::Can => CanSignal::from_name(name).map(Symbol::Can),
            PeripheralType::Usb => UsbSignal::from_name(name).map(Symbol::Usb),
            PeripheralType::I2s => I2sSignal::from_name(name).map(Symbol::I2s),
            PeripheralType::Ir => IrSignal::from_name(name).map(Symbol::Ir),
            PeripheralType::Comp => CompSignal::from_name(name).map(Symbol::Comp),
            PeripheralType::Opamp => OpampSignal::from_name(name).map(Symbol::Opamp),
            PeripheralType::Gpio | PeripheralType::Adc | PeripheralType::Dac => None,
        }
    }

    pub fn peripheral(self) -> PeripheralType {
        match self {
            Symbol::Sys(_) => PeripheralType::Sys,
            Symbol::Rcc(_) => PeripheralType::Rcc,
            Symbol::Tim(_) => PeripheralType::Tim,
            Symbol::Rtc(_) => PeripheralType::Rtc,
            Symbol::Usart(_) => PeripheralType::Usart,
            Symbol::I2c(_) => PeripheralType::I2c,
            Symbol::Spi(_) => PeripheralType::Spi,
            Symbol::Can(_) => PeripheralType::Can,
            Symbol::Usb(_) => PeripheralType::Usb,
            Symbol::I2s(_) => PeripheralType::I2s,
            Symbol::Ir(_) => PeripheralType::Ir,
            Symbol::Comp(_) => PeripheralType::Comp,
            Symbol::Opamp(_) => PeripheralType::Opamp,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Symbol::Sys(s) => s.name(),
            Symbol::Rcc(s) => s.name(),
            Symbol::Tim(s) => s.name(),
            Symbol::Rtc(s) => s.name(),
            Symbol::Usart(s) => s.name(),
            Symbol::I2c(s) => s.name(),
            Symbol::Spi(s) => s.name(),
            Symbol::Can(s) => s.name(),
            Symbol::Usb(s) => s.name(),
            Symbol::I2s(s) => s.name(),
            Symbol::Ir(s) => s.name(),
            Symbol::Comp(s) => s.name(),
            Symbol::Opamp(s) => s.name(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// The role a binding plays within its peripheral instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum SubSignal {
    /// Numeric channel: GPIO pin number, analog input/output number, or an
    /// external-trigger channel shifted by [`EXTI_CHANNEL_OFFSET`].
    Channel(u32),
    Named(Symbol),
}

impl fmt::Display for SubSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubSignal::Channel(n) => write!(f, "{}", n),
            SubSignal::Named(s) => f.write_str(s.name()),
        }
    }
}
