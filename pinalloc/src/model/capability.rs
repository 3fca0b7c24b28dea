//! Physical pin capabilities of one microcontroller package.

use serde::Serialize;
use std::fmt;

use super::peripheral::{PeripheralType, SubSignal};

/// A `(type, instance, sub-signal)` triple a pin can be configured to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Binding {
    pub peripheral: PeripheralType,
    pub instance: u32,
    pub sub_signal: SubSignal,
}

impl Binding {
    pub fn new(peripheral: PeripheralType, instance: u32, sub_signal: SubSignal) -> Self {
        Self {
            peripheral,
            instance,
            sub_signal,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            self.peripheral.instance_label(self.instance),
            self.sub_signal
        )
    }
}

/// One named capability a pin can provide, as classified from the vendor name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalSignal {
    /// Vendor signal name before alias normalization, e.g. `SPI1_NSS`.
    pub raw_name: String,
    pub peripheral: PeripheralType,
    pub instance: u32,
    pub sub_signal: SubSignal,
}

impl PhysicalSignal {
    pub fn new(
        raw_name: impl Into<String>,
        peripheral: PeripheralType,
        instance: u32,
        sub_signal: SubSignal,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            peripheral,
            instance,
            sub_signal,
        }
    }

    pub fn binding(&self) -> Binding {
        Binding::new(self.peripheral, self.instance, self.sub_signal)
    }
}

/// A physical pin usable as general-purpose I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalPin {
    /// Index of the pin among all pin entries of the hardware document.
    pub id: usize,
    pub name: String,
    /// Package position (ball or lead number).
    pub position: u32,
    pub signals: Vec<PhysicalSignal>,
}

impl PhysicalPin {
    pub fn new(
        id: usize,
        name: impl Into<String>,
        position: u32,
        signals: Vec<PhysicalSignal>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            signals,
        }
    }

    /// Distinct bindings this pin can carry, in first-seen signal order.
    pub fn bindings(&self) -> Vec<Binding> {
        let mut bindings: Vec<Binding> = Vec::with_capacity(self.signals.len());
        for signal in &self.signals {
            let binding = signal.binding();
            if !bindings.contains(&binding) {
                bindings.push(binding);
            }
        }
        bindings
    }

    pub fn offers(&self, peripheral: PeripheralType) -> bool {
        self.signals.iter().any(|s| s.peripheral == peripheral)
    }

    /// The first vendor signal that realizes `binding` on this pin.
    pub fn signal_for(&self, binding: &Binding) -> Option<&PhysicalSignal> {
        self.signals.iter().find(|s| s.binding() == *binding)
    }
}

/// Package metadata read from the hardware document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct McuInfo {
    pub ref_name: Option<String>,
    pub family: Option<String>,
    pub package: Option<String>,
}

impl McuInfo {
    pub fn display_name(&self) -> &str {
        self.ref_name.as_deref().unwrap_or("unknown MCU")
    }
}

/// A vendor signal dropped during lenient ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedSignal {
    pub pin: String,
    pub raw_name: String,
    pub reason: String,
}

/// Everything known about the pins of one package.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapabilityModel {
    pub mcu: McuInfo,
    pub pins: Vec<PhysicalPin>,
    pub dropped: Vec<DroppedSignal>,
}

impl CapabilityModel {
    pub fn new(pins: Vec<PhysicalPin>) -> Self {
        Self {
            mcu: McuInfo::default(),
            pins,
            dropped: Vec::new(),
        }
    }

    pub fn pin_by_name(&self, name: &str) -> Option<&PhysicalPin> {
        self.pins.iter().find(|p| p.name == name)
    }

    /// Pins offering at least one signal of `peripheral`.
    pub fn pins_offering(&self, peripheral: PeripheralType) -> impl Iterator<Item = &PhysicalPin> {
        self.pins.iter().filter(move |p| p.offers(peripheral))
    }

    /// Instance numbers of `peripheral` present anywhere on the package.
    pub fn instances_of(&self, peripheral: PeripheralType) -> Vec<u32> {
        let mut instances: Vec<u32> = self
            .pins
            .iter()
            .flat_map(|p| p.signals.iter())
            .filter(|s| s.peripheral == peripheral)
            .map(|s| s.instance)
            .collect();
        instances.sort_unstable();
        instances.dedup();
        instances
    }
}
