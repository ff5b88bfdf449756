//! klang core library.
//!
//! Generic sound-card control capability set and its hardware transport
//! backend. A control handle exposes the card's named elements for
//! enumeration, inspection, reads, writes, and change notification; the
//! hardware backend maps each capability onto a fixed operation code carried
//! over the card's control node, negotiating the protocol version at open
//! and gating newer operations on it.

pub mod config;
pub mod error;
pub mod hw;
pub mod ops;
pub mod paths;
pub mod types;
pub mod version;

// Re-export commonly used items
pub use config::{CardRef, CardResolver, CtlConfig};
pub use error::{CtlError, Result};
pub use hw::{CardLoader, CtlTransport, DevTransport, HwControl, HwCtl, NoopLoader, PcmInfoFixup, MAX_CARDS};
pub use ops::{ControlOps, OpenMode, TlvMode};
pub use types::{
    CardInfo, ElemId, ElemIface, ElemInfo, ElemList, ElemType, ElemValue, Event, HwdepInfo,
    PcmInfo, PowerState, RawmidiInfo,
};
pub use version::{ProtocolVersion, CTL_VERSION_MAX, ENUM_ELEM_MIN_VERSION, TLV_MIN_VERSION};
