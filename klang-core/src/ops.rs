//! Generic control capability set.
//!
//! Every transport backend implements [`ControlOps`], one method per
//! capability. The hardware backend in [`crate::hw`] maps each method onto a
//! fixed operation code; alternative transports are additional
//! implementations, not branches inside it.

use crate::error::Result;
use crate::types::{
    CardInfo, ElemId, ElemInfo, ElemList, ElemValue, Event, HwdepInfo, PcmInfo, PowerState,
    RawmidiInfo,
};
use bitflags::bitflags;

bitflags! {
    /// Open mode for a control handle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenMode: u32 {
        /// Open read-only instead of read-write.
        const READONLY = 1 << 0;
        /// Open in non-blocking mode.
        const NONBLOCK = 1 << 1;
        /// Enable signal-driven async notification at open.
        const ASYNC = 1 << 2;
    }
}

impl OpenMode {
    /// Map to the `open(2)` flag set.
    pub(crate) fn to_oflags(self) -> libc::c_int {
        let mut flags = if self.contains(Self::READONLY) { libc::O_RDONLY } else { libc::O_RDWR };
        if self.contains(Self::NONBLOCK) {
            flags |= libc::O_NONBLOCK;
        }
        if self.contains(Self::ASYNC) {
            flags |= libc::O_ASYNC;
        }
        flags
    }
}

/// Direction of a TLV buffer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvMode {
    /// Execute a device-defined command carried in the buffer.
    Command,
    /// Read the element's TLV data into the buffer.
    Read,
    /// Write the buffer to the element.
    Write,
}

/// One control transport: the full capability set over a single card.
///
/// Operations are synchronous. In non-blocking mode, calls that would wait
/// return a "would block" system error instead; `read_event` reports it as
/// `Ok(None)`.
pub trait ControlOps {
    /// Release the underlying handle. Every later operation fails with
    /// [`crate::CtlError::Closed`].
    fn close(&mut self) -> Result<()>;

    /// Toggle non-blocking mode without disturbing unrelated handle flags.
    fn set_nonblocking(&mut self, enabled: bool) -> Result<()>;

    /// Configure signal-driven async notification. A negative `signal`
    /// disables delivery; otherwise `signal` is armed with `owner` as the
    /// delivery target.
    fn set_async(&mut self, signal: i32, owner: libc::pid_t) -> Result<()>;

    /// Enable or disable event delivery on this handle.
    fn subscribe_events(&mut self, subscribe: bool) -> Result<()>;

    fn card_info(&mut self, info: &mut CardInfo) -> Result<()>;

    /// List element identifiers. `list.offset` and the allocated space select
    /// the paging window.
    fn elem_list(&mut self, list: &mut ElemList) -> Result<()>;

    fn elem_info(&mut self, info: &mut ElemInfo) -> Result<()>;

    /// Create a user element. The device assigns `info.id.numid`.
    fn elem_add(&mut self, info: &mut ElemInfo) -> Result<()>;

    /// Replace an existing user element.
    fn elem_replace(&mut self, info: &mut ElemInfo) -> Result<()>;

    fn elem_remove(&mut self, id: &mut ElemId) -> Result<()>;

    fn elem_read(&mut self, value: &mut ElemValue) -> Result<()>;

    fn elem_write(&mut self, value: &mut ElemValue) -> Result<()>;

    fn elem_lock(&mut self, id: &mut ElemId) -> Result<()>;

    fn elem_unlock(&mut self, id: &mut ElemId) -> Result<()>;

    /// TLV buffer exchange against the element identified by `numid`.
    ///
    /// `buf` is a word buffer; its byte length is the capacity for reads and
    /// the payload length for writes and commands.
    fn elem_tlv(&mut self, mode: TlvMode, numid: u32, buf: &mut [u32]) -> Result<()>;

    /// Next hwdep device after `device`, or -1 when exhausted. Start at -1.
    fn hwdep_next_device(&mut self, device: i32) -> Result<i32>;

    fn hwdep_info(&mut self, info: &mut HwdepInfo) -> Result<()>;

    /// Next PCM device after `device`, or -1 when exhausted. Start at -1.
    fn pcm_next_device(&mut self, device: i32) -> Result<i32>;

    fn pcm_info(&mut self, info: &mut PcmInfo) -> Result<()>;

    fn pcm_prefer_subdevice(&mut self, subdevice: i32) -> Result<()>;

    /// Next raw MIDI device after `device`, or -1 when exhausted. Start at -1.
    fn rawmidi_next_device(&mut self, device: i32) -> Result<i32>;

    fn rawmidi_info(&mut self, info: &mut RawmidiInfo) -> Result<()>;

    fn rawmidi_prefer_subdevice(&mut self, subdevice: i32) -> Result<()>;

    fn set_power_state(&mut self, state: PowerState) -> Result<()>;

    fn power_state(&mut self) -> Result<PowerState>;

    /// Read one change notification. Returns `Ok(None)` when the handle is
    /// non-blocking and no event is pending.
    fn read_event(&mut self) -> Result<Option<Event>>;
}
