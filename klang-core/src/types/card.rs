//! Card-level descriptor.

use super::field_str;
use std::fmt;

/// Card information record, filled whole by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct CardInfo {
    /// Card index.
    pub card: i32,
    id: [u8; 16],
    driver: [u8; 16],
    name: [u8; 32],
    longname: [u8; 80],
    mixername: [u8; 80],
    components: [u8; 128],
}

impl CardInfo {
    pub fn zeroed() -> Self {
        Self {
            card: 0,
            id: [0; 16],
            driver: [0; 16],
            name: [0; 32],
            longname: [0; 80],
            mixername: [0; 80],
            components: [0; 128],
        }
    }

    /// Short mnemonic card identifier.
    pub fn id_str(&self) -> String {
        field_str(&self.id)
    }

    /// Driver name.
    pub fn driver_str(&self) -> String {
        field_str(&self.driver)
    }

    /// Short card name.
    pub fn name_str(&self) -> String {
        field_str(&self.name)
    }

    /// Long card name, usually including the bus location.
    pub fn longname_str(&self) -> String {
        field_str(&self.longname)
    }

    /// Mixer name.
    pub fn mixername_str(&self) -> String {
        field_str(&self.mixername)
    }

    /// Space-separated component identifiers.
    pub fn components_str(&self) -> String {
        field_str(&self.components)
    }
}

impl fmt::Display for CardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card {} [{}]: {}", self.card, self.id_str(), self.name_str())
    }
}
