//! Control element types.
//!
//! An element is one named, typed, addressable control point exposed by a
//! card. The identifier round-trips unchanged through list, info, read,
//! write, lock, and remove operations.

use super::{field_str, read_i64, read_u32, set_field_str, write_i64, write_u32};
use std::fmt;

/// Maximum length of an element name, including the NUL terminator.
pub const ELEM_NAME_MAX: usize = 44;

/// Size of the type-tagged value payload in an [`ElemValue`].
pub const ELEM_VALUE_BYTES: usize = 512;

/// Device interface an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ElemIface {
    Card = 0,
    Hwdep = 1,
    Mixer = 2,
    Pcm = 3,
    Rawmidi = 4,
    Timer = 5,
    Sequencer = 6,
}

impl ElemIface {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Card),
            1 => Some(Self::Hwdep),
            2 => Some(Self::Mixer),
            3 => Some(Self::Pcm),
            4 => Some(Self::Rawmidi),
            5 => Some(Self::Timer),
            6 => Some(Self::Sequencer),
            _ => None,
        }
    }
}

impl fmt::Display for ElemIface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Card => "card",
            Self::Hwdep => "hwdep",
            Self::Mixer => "mixer",
            Self::Pcm => "pcm",
            Self::Rawmidi => "rawmidi",
            Self::Timer => "timer",
            Self::Sequencer => "sequencer",
        };
        write!(f, "{}", name)
    }
}

/// Value type of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ElemType {
    None = 0,
    Boolean = 1,
    Integer = 2,
    Enumerated = 3,
    Bytes = 4,
    Iec958 = 5,
    Integer64 = 6,
}

impl ElemType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Boolean),
            2 => Some(Self::Integer),
            3 => Some(Self::Enumerated),
            4 => Some(Self::Bytes),
            5 => Some(Self::Iec958),
            6 => Some(Self::Integer64),
            _ => None,
        }
    }

    pub const fn raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Enumerated => "enumerated",
            Self::Bytes => "bytes",
            Self::Iec958 => "iec958",
            Self::Integer64 => "integer64",
        };
        write!(f, "{}", name)
    }
}

/// Element access bits, as reported in [`ElemInfo::access`].
pub mod access {
    pub const READ: u32 = 1 << 0;
    pub const WRITE: u32 = 1 << 1;
    pub const VOLATILE: u32 = 1 << 2;
    pub const TLV_READ: u32 = 1 << 4;
    pub const TLV_WRITE: u32 = 1 << 5;
    pub const LOCKED: u32 = 1 << 9;
    pub const USER: u32 = 1 << 29;
}

/// Opaque key identifying one control element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ElemId {
    /// Numeric identifier assigned by the device (0 until assigned).
    pub numid: u32,
    /// Interface the element belongs to (raw [`ElemIface`] value).
    pub interface: u32,
    /// Device number within the interface.
    pub device: u32,
    /// Subdevice number within the device.
    pub subdevice: u32,
    /// NUL-terminated element name.
    pub name: [u8; ELEM_NAME_MAX],
    /// Index among elements with the same name.
    pub index: u32,
}

impl ElemId {
    pub fn zeroed() -> Self {
        Self {
            numid: 0,
            interface: 0,
            device: 0,
            subdevice: 0,
            name: [0; ELEM_NAME_MAX],
            index: 0,
        }
    }

    /// Identifier addressing an element by interface and name.
    pub fn named(interface: ElemIface, name: &str) -> Self {
        let mut id = Self::zeroed();
        id.interface = interface as u32;
        id.set_name(name);
        id
    }

    /// Identifier addressing an element by its assigned numid.
    pub fn by_numid(numid: u32) -> Self {
        let mut id = Self::zeroed();
        id.numid = numid;
        id
    }

    pub fn name_str(&self) -> String {
        field_str(&self.name)
    }

    pub fn set_name(&mut self, name: &str) {
        set_field_str(&mut self.name, name);
    }

    pub fn iface(&self) -> Option<ElemIface> {
        ElemIface::from_raw(self.interface)
    }
}

impl fmt::Display for ElemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "numid={},iface={},name='{}',index={}",
            self.numid, self.interface, self.name_str(), self.index
        )
    }
}

/// Element metadata: identifier, value type, access bits, and type-specific
/// range information.
///
/// Supplied by the caller for add/replace, filled by the device for info
/// queries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct ElemInfo {
    pub id: ElemId,
    elem_type: u32,
    pub access: u32,
    /// Number of values held by the element.
    pub count: u32,
    /// Process currently holding the element lock, or -1.
    pub owner: i32,
    /// Type-tagged range data: integer min/max/step, enumerated item info.
    type_data: [u8; 128],
    reserved: [u8; 64],
}

impl ElemInfo {
    pub fn new(id: ElemId, elem_type: ElemType, count: u32) -> Self {
        Self {
            id,
            elem_type: elem_type.raw(),
            access: access::READ | access::WRITE,
            count,
            owner: -1,
            type_data: [0; 128],
            reserved: [0; 64],
        }
    }

    pub fn zeroed() -> Self {
        Self::new(ElemId::zeroed(), ElemType::None, 0)
    }

    pub fn elem_type(&self) -> Option<ElemType> {
        ElemType::from_raw(self.elem_type)
    }

    pub fn set_elem_type(&mut self, elem_type: ElemType) {
        self.elem_type = elem_type.raw();
    }

    /// Integer value range (min, max, step). Meaningful for integer kinds.
    pub fn integer_range(&self) -> (i64, i64, i64) {
        (
            read_i64(&self.type_data, 0),
            read_i64(&self.type_data, 8),
            read_i64(&self.type_data, 16),
        )
    }

    pub fn set_integer_range(&mut self, min: i64, max: i64, step: i64) {
        write_i64(&mut self.type_data, 0, min);
        write_i64(&mut self.type_data, 8, max);
        write_i64(&mut self.type_data, 16, step);
    }

    /// Number of items for enumerated elements.
    pub fn items(&self) -> u32 {
        read_u32(&self.type_data, 0)
    }

    pub fn set_items(&mut self, items: u32) {
        write_u32(&mut self.type_data, 0, items);
    }
}

/// Element value: identifier plus a type-tagged payload region.
#[derive(Clone, PartialEq, Eq)]
#[repr(C)]
pub struct ElemValue {
    pub id: ElemId,
    value: [u8; ELEM_VALUE_BYTES],
}

impl ElemValue {
    pub fn new(id: ElemId) -> Self {
        Self { id, value: [0; ELEM_VALUE_BYTES] }
    }

    pub fn zeroed() -> Self {
        Self::new(ElemId::zeroed())
    }

    /// Integer payload slot `idx`. Valid for boolean, integer, and integer64
    /// elements.
    pub fn integer(&self, idx: usize) -> i64 {
        read_i64(&self.value, idx * 8)
    }

    pub fn set_integer(&mut self, idx: usize, value: i64) {
        write_i64(&mut self.value, idx * 8, value);
    }

    /// Enumerated item index at payload slot `idx`.
    pub fn enumerated(&self, idx: usize) -> u32 {
        read_u32(&self.value, idx * 4)
    }

    pub fn set_enumerated(&mut self, idx: usize, item: u32) {
        write_u32(&mut self.value, idx * 4, item);
    }

    pub fn bytes(&self) -> &[u8; ELEM_VALUE_BYTES] {
        &self.value
    }

    pub fn bytes_mut(&mut self) -> &mut [u8; ELEM_VALUE_BYTES] {
        &mut self.value
    }
}

impl fmt::Debug for ElemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElemValue").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Wire header for the element list exchange.
///
/// `pids` is the caller-space address of an [`ElemId`] array with room for
/// `space` entries, or 0 when only the total count is wanted.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ElemListHeader {
    pub offset: u32,
    pub space: u32,
    pub used: u32,
    pub count: u32,
    pub pids: u64,
    pub reserved: [u8; 48],
}

/// Element list query: paging window plus the identifier array the device
/// fills in.
#[derive(Debug, Clone, Default)]
pub struct ElemList {
    /// Index of the first element to return.
    pub offset: u32,
    used: u32,
    count: u32,
    ids: Vec<ElemId>,
}

impl ElemList {
    /// Count-only query: no identifier storage, the device just reports the
    /// total element count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Query with storage for up to `space` identifiers.
    pub fn with_space(space: usize) -> Self {
        Self { offset: 0, used: 0, count: 0, ids: vec![ElemId::zeroed(); space] }
    }

    pub fn space(&self) -> usize {
        self.ids.len()
    }

    /// Identifiers filled by the last query.
    pub fn ids(&self) -> &[ElemId] {
        &self.ids[..self.used as usize]
    }

    /// Number of identifiers the device stored.
    pub fn used(&self) -> usize {
        self.used as usize
    }

    /// Total number of elements on the card.
    pub fn count(&self) -> usize {
        self.count as usize
    }

    pub(crate) fn ids_addr(&mut self) -> u64 {
        if self.ids.is_empty() {
            0
        } else {
            self.ids.as_mut_ptr() as u64
        }
    }

    pub(crate) fn set_result(&mut self, used: u32, count: u32) {
        self.used = used.min(self.ids.len() as u32);
        self.count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elem_id_name_round_trip() {
        let id = ElemId::named(ElemIface::Mixer, "Master Playback Volume");
        assert_eq!(id.name_str(), "Master Playback Volume");
        assert_eq!(id.iface(), Some(ElemIface::Mixer));
    }

    #[test]
    fn test_elem_id_name_truncated() {
        let long = "x".repeat(ELEM_NAME_MAX + 10);
        let id = ElemId::named(ElemIface::Card, &long);
        assert_eq!(id.name_str().len(), ELEM_NAME_MAX - 1);
    }

    #[test]
    fn test_elem_info_integer_range() {
        let mut info = ElemInfo::new(ElemId::by_numid(7), ElemType::Integer, 2);
        info.set_integer_range(-64, 64, 1);
        assert_eq!(info.integer_range(), (-64, 64, 1));
        assert_eq!(info.elem_type(), Some(ElemType::Integer));
    }

    #[test]
    fn test_elem_value_integer_slots() {
        let mut value = ElemValue::new(ElemId::by_numid(3));
        value.set_integer(0, -12);
        value.set_integer(1, 99);
        assert_eq!(value.integer(0), -12);
        assert_eq!(value.integer(1), 99);
    }

    #[test]
    fn test_elem_list_count_only() {
        let mut list = ElemList::new();
        assert_eq!(list.space(), 0);
        assert_eq!(list.ids_addr(), 0);
        list.set_result(0, 42);
        assert_eq!(list.count(), 42);
        assert!(list.ids().is_empty());
    }

    #[test]
    fn test_elem_list_used_clamped_to_space() {
        let mut list = ElemList::with_space(4);
        list.set_result(9, 9);
        assert_eq!(list.used(), 4);
    }
}
