//! Control domain types.
//!
//! Everything in here is exchanged with the device as a fixed-layout record,
//! so the structs are `#[repr(C)]` with explicit field widths and no padding.

pub mod card;
pub mod device;
pub mod elem;
pub mod event;
pub mod power;

pub use card::CardInfo;
pub use device::{HwdepInfo, PcmInfo, RawmidiInfo};
pub use elem::{ElemId, ElemIface, ElemInfo, ElemList, ElemListHeader, ElemType, ElemValue};
pub use event::Event;
pub use power::PowerState;

/// Decode a NUL-terminated byte field into an owned string.
pub(crate) fn field_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Copy a string into a fixed NUL-terminated byte field, truncating if needed.
pub(crate) fn set_field_str(field: &mut [u8], value: &str) {
    field.fill(0);
    let src = value.as_bytes();
    let n = src.len().min(field.len() - 1);
    field[..n].copy_from_slice(&src[..n]);
}

pub(crate) fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_ne_bytes(buf)
}

pub(crate) fn write_i64(bytes: &mut [u8], offset: usize, value: i64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_ne_bytes(buf)
}

pub(crate) fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}
