//! MCU hardware document parser.
//!
//! Reads STM32CubeMX-style MCU descriptions:
//!
//! ```text
//! <Mcu RefName="STM32F303K8Tx" Family="STM32F3" Package="LQFP32">
//!   <Pin Name="PA9" Position="19" Type="I/O">
//!     <Signal Name="USART1_TX"/>
//!     <Signal Name="GPIO" IOModes="Input,Output,Analog,EXTI"/>
//!   </Pin>
//! </Mcu>
//! ```
//!
//! Only pins of type `I/O` are kept. Pin ids are the index among all `<Pin>`
//! entries, so they stay stable when non-I/O pins are filtered out.

use std::path::Path;

use crate::model::{CapabilityModel, DroppedSignal, McuInfo, PhysicalPin, PhysicalSignal};
use crate::parser::signal::classify_signal;
use crate::parser::{IngestionError, SignalPolicy};

const IO_PIN_TYPE: &str = "I/O";

pub struct McuParser;

impl McuParser {
    /// Read and parse a hardware document from disk.
    pub fn parse_file(path: &Path, policy: SignalPolicy) -> Result<CapabilityModel, IngestionError> {
        let content = std::fs::read_to_string(path).map_err(|source| IngestionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::parse_str(&content, policy)?;
        tracing::info!(
            "Loaded {} I/O pins for {} from {:?}",
            model.pins.len(),
            model.mcu.display_name(),
            path
        );
        Ok(model)
    }

    pub fn parse_str(xml: &str, policy: SignalPolicy) -> Result<CapabilityModel, IngestionError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        if root.tag_name().name() != "Mcu" {
            return Err(IngestionError::MissingMcuRoot(root.tag_name().name().to_string()));
        }

        let mcu = McuInfo {
            ref_name: root.attribute("RefName").map(str::to_string),
            family: root.attribute("Family").map(str::to_string),
            package: root.attribute("Package").map(str::to_string),
        };

        let mut pins = Vec::new();
        let mut dropped = Vec::new();

        let pin_nodes = root
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "Pin");

        for (id, node) in pin_nodes.enumerate() {
            let name = node.attribute("Name").ok_or_else(|| IngestionError::MalformedPin {
                index: id,
                reason: "missing Name attribute".to_string(),
            })?;

            if node.attribute("Type") != Some(IO_PIN_TYPE) {
                tracing::debug!("Skipping non-I/O pin {}", name);
                continue;
            }

            let position = node
                .attribute("Position")
                .ok_or_else(|| IngestionError::MalformedPin {
                    index: id,
                    reason: format!("pin {} has no Position attribute", name),
                })?;
            let position: u32 = position.trim().parse().map_err(|_| IngestionError::MalformedPin {
                index: id,
                reason: format!("pin {} has non-numeric position '{}'", name, position),
            })?;

            let mut signals: Vec<PhysicalSignal> = Vec::new();
            let signal_nodes = node
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "Signal");

            for signal_node in signal_nodes {
                let raw = signal_node.attribute("Name").ok_or_else(|| IngestionError::MalformedPin {
                    index: id,
                    reason: format!("signal without Name on pin {}", name),
                })?;
                if signals.iter().any(|s| s.raw_name == raw) {
                    continue;
                }

                match classify_signal(name, raw) {
                    Ok(signal) => signals.push(signal),
                    Err(reason) => match policy {
                        SignalPolicy::Strict => {
                            return Err(IngestionError::UnrecognizedSignal {
                                pin: name.to_string(),
                                signal: raw.to_string(),
                                reason,
                            });
                        }
                        SignalPolicy::Lenient => {
                            tracing::warn!("Dropping signal {} on pin {}: {}", raw, name, reason);
                            dropped.push(DroppedSignal {
                                pin: name.to_string(),
                                raw_name: raw.to_string(),
                                reason: reason.to_string(),
                            });
                        }
                    },
                }
            }

            pins.push(PhysicalPin::new(id, name, position, signals));
        }

        Ok(CapabilityModel { mcu, pins, dropped })
    }
}
