//! Per-interface device descriptors reachable through a control handle.

use super::field_str;

/// Hardware-dependent device descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct HwdepInfo {
    /// Device number; set by the caller before the query.
    pub device: u32,
    pub card: i32,
    id: [u8; 64],
    name: [u8; 80],
    /// Interface kind, driver-specific.
    pub iface: u32,
    reserved: [u8; 64],
}

impl HwdepInfo {
    pub fn for_device(device: u32) -> Self {
        Self { device, card: 0, id: [0; 64], name: [0; 80], iface: 0, reserved: [0; 64] }
    }

    pub fn id_str(&self) -> String {
        field_str(&self.id)
    }

    pub fn name_str(&self) -> String {
        field_str(&self.name)
    }
}

/// PCM device descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct PcmInfo {
    /// Device number; set by the caller before the query.
    pub device: u32,
    /// Subdevice number; set by the caller before the query.
    pub subdevice: u32,
    /// Stream direction (0 playback, 1 capture).
    pub stream: u32,
    pub card: i32,
    id: [u8; 64],
    name: [u8; 80],
    subname: [u8; 32],
    pub dev_class: u32,
    pub dev_subclass: u32,
    pub subdevices_count: u32,
    pub subdevices_avail: u32,
    reserved: [u8; 64],
}

impl PcmInfo {
    pub fn for_device(device: u32, stream: u32) -> Self {
        Self {
            device,
            subdevice: 0,
            stream,
            card: 0,
            id: [0; 64],
            name: [0; 80],
            subname: [0; 32],
            dev_class: 0,
            dev_subclass: 0,
            subdevices_count: 0,
            subdevices_avail: 0,
            reserved: [0; 64],
        }
    }

    pub fn id_str(&self) -> String {
        field_str(&self.id)
    }

    pub fn name_str(&self) -> String {
        field_str(&self.name)
    }

    pub fn subname_str(&self) -> String {
        field_str(&self.subname)
    }
}

/// Raw MIDI device descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct RawmidiInfo {
    /// Device number; set by the caller before the query.
    pub device: u32,
    /// Subdevice number; set by the caller before the query.
    pub subdevice: u32,
    /// Stream direction (0 output, 1 input).
    pub stream: u32,
    pub card: i32,
    pub flags: u32,
    id: [u8; 64],
    name: [u8; 80],
    subname: [u8; 32],
    pub subdevices_count: u32,
    pub subdevices_avail: u32,
    reserved: [u8; 64],
}

impl RawmidiInfo {
    pub fn for_device(device: u32, stream: u32) -> Self {
        Self {
            device,
            subdevice: 0,
            stream,
            card: 0,
            flags: 0,
            id: [0; 64],
            name: [0; 80],
            subname: [0; 32],
            subdevices_count: 0,
            subdevices_avail: 0,
            reserved: [0; 64],
        }
    }

    pub fn id_str(&self) -> String {
        field_str(&self.id)
    }

    pub fn name_str(&self) -> String {
        field_str(&self.name)
    }

    pub fn subname_str(&self) -> String {
        field_str(&self.subname)
    }
}
