//! Hardware control backend.
//!
//! Talks directly to the kernel driver through the card's control node. Raw
//! communication, no conversions: every capability is one fixed operation
//! code, and records cross the boundary exactly as the driver lays them out.
//!
//! Configuration node:
//!
//! ```json
//! { "type": "hw", "card": 0 }
//! ```
//!
//! `card` accepts a numeric index or a name resolved through a
//! [`CardResolver`](crate::config::CardResolver).

pub mod device;
pub mod ioctl;
mod tlv;

pub use device::{CardLoader, NoopLoader, MAX_CARDS};
pub use ioctl::{CtlTransport, DevTransport, Op};

use crate::config::{CardResolver, CtlConfig};
use crate::error::{CtlError, Result};
use crate::ops::{ControlOps, OpenMode, TlvMode};
use crate::types::{
    CardInfo, ElemId, ElemInfo, ElemList, ElemListHeader, ElemType, ElemValue, Event, HwdepInfo,
    PcmInfo, PowerState, RawmidiInfo,
};
use crate::version::{ProtocolVersion, CTL_VERSION_MAX, ENUM_ELEM_MIN_VERSION, TLV_MIN_VERSION};
use ioctl::Wire;
use std::io;
use tracing::{debug, error};

/// Post-processing hook for PCM descriptors.
///
/// Some drivers return descriptors that need a narrow correction after the
/// raw exchange. The hook decides whether a descriptor is affected and
/// rewrites the affected fields; it is layered on top of the protocol
/// response and never changes the exchange itself.
pub trait PcmInfoFixup {
    /// Whether `info` needs the correction.
    fn applies(&self, info: &PcmInfo) -> bool;

    /// Rewrite the affected fields in place.
    fn apply(&self, info: &mut PcmInfo) -> Result<()>;
}

/// Hardware control backend over one card.
///
/// Owns the open transport exclusively; the card index and the negotiated
/// protocol version are fixed for its lifetime. No internal locking: callers
/// serialize access themselves.
pub struct HwControl<T: CtlTransport> {
    card: u32,
    version: ProtocolVersion,
    transport: Option<T>,
    pcm_fixup: Option<Box<dyn PcmInfoFixup>>,
}

impl<T: CtlTransport> std::fmt::Debug for HwControl<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwControl")
            .field("card", &self.card)
            .field("version", &self.version)
            .field("transport_open", &self.transport.is_some())
            .field("has_pcm_fixup", &self.pcm_fixup.is_some())
            .finish()
    }
}

/// Hardware backend over the real device transport.
pub type HwCtl = HwControl<DevTransport>;

impl HwCtl {
    /// Open the control node of `card`.
    pub fn open(card: u32, mode: OpenMode) -> Result<Self> {
        Self::open_with_loader(card, mode, &NoopLoader)
    }

    /// Open the control node of `card`, invoking `loader` once if the node
    /// is absent on the first attempt.
    pub fn open_with_loader(card: u32, mode: OpenMode, loader: &dyn CardLoader) -> Result<Self> {
        let fd = device::open_card(card, mode, loader)?;
        Self::from_transport(card, DevTransport::new(fd))
    }

    /// Open the backend described by a configuration node.
    pub fn open_from_config(
        config: &CtlConfig,
        mode: OpenMode,
        resolver: &dyn CardResolver,
    ) -> Result<Self> {
        let card = config.resolve_card(resolver)?;
        Self::open(card, mode)
    }
}

impl<T: CtlTransport> HwControl<T> {
    /// Wrap an already-open transport, negotiating the protocol version.
    ///
    /// On any failure the transport is dropped, so the caller never holds a
    /// half-initialized backend.
    pub fn from_transport(card: u32, mut transport: T) -> Result<Self> {
        let mut raw: u32 = 0;
        transport
            .ioctl(Op::Pversion, raw.as_bytes_mut())
            .map_err(|e| CtlError::sys(Op::Pversion.name(), e))?;
        let version = ProtocolVersion::from_raw(raw);
        if !version.is_compatible_with(CTL_VERSION_MAX) {
            return Err(CtlError::IncompatibleVersion {
                reported: version,
                supported: CTL_VERSION_MAX,
            });
        }
        debug!(card, version = %version, "negotiated control protocol");
        metrics::counter!("klang.ctl.opened").increment(1);
        Ok(Self { card, version, transport: Some(transport), pcm_fixup: None })
    }

    /// Card index this backend is bound to.
    pub fn card(&self) -> u32 {
        self.card
    }

    /// Protocol version negotiated at open.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Install the PCM descriptor correction hook.
    pub fn set_pcm_info_fixup(&mut self, fixup: Box<dyn PcmInfoFixup>) {
        self.pcm_fixup = Some(fixup);
    }

    fn requires_at_least(&self, required: ProtocolVersion) -> Result<()> {
        if self.version < required {
            return Err(CtlError::NotSupported { required, negotiated: self.version });
        }
        Ok(())
    }

    fn transport_mut(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(CtlError::Closed)
    }

    /// One fixed-shape exchange; the failure carries the raw OS error.
    fn exchange<W: Wire>(&mut self, op: Op, record: &mut W) -> Result<()> {
        let transport = self.transport_mut()?;
        transport.ioctl(op, record.as_bytes_mut()).map_err(|e| CtlError::sys(op.name(), e))
    }

    /// Exchange that logs failures, for the operations that historically do.
    fn exchange_logged<W: Wire>(&mut self, op: Op, record: &mut W) -> Result<()> {
        let result = self.exchange(op, record);
        if let Err(e) = &result {
            error!(card = self.card, error = %e, "{} failed", op.name());
        }
        result
    }
}

impl<T: CtlTransport> ControlOps for HwControl<T> {
    fn close(&mut self) -> Result<()> {
        let transport = self.transport.take().ok_or(CtlError::Closed)?;
        transport.close().map_err(|e| CtlError::sys("close", e))
    }

    fn set_nonblocking(&mut self, enabled: bool) -> Result<()> {
        let transport = self.transport_mut()?;
        let mut flags = match transport.flags() {
            Ok(flags) => flags,
            Err(e) => {
                error!(error = %e, "F_GETFL failed");
                return Err(CtlError::sys("F_GETFL", e));
            }
        };
        if enabled {
            flags |= libc::O_NONBLOCK;
        } else {
            flags &= !libc::O_NONBLOCK;
        }
        if let Err(e) = transport.set_flags(flags) {
            error!(error = %e, "F_SETFL for O_NONBLOCK failed");
            return Err(CtlError::sys("F_SETFL", e));
        }
        Ok(())
    }

    fn set_async(&mut self, signal: i32, owner: libc::pid_t) -> Result<()> {
        let transport = self.transport_mut()?;
        let mut flags = match transport.flags() {
            Ok(flags) => flags,
            Err(e) => {
                error!(error = %e, "F_GETFL failed");
                return Err(CtlError::sys("F_GETFL", e));
            }
        };
        if signal >= 0 {
            flags |= libc::O_ASYNC;
        } else {
            flags &= !libc::O_ASYNC;
        }
        if let Err(e) = transport.set_flags(flags) {
            error!(error = %e, "F_SETFL for O_ASYNC failed");
            return Err(CtlError::sys("F_SETFL", e));
        }
        if signal < 0 {
            return Ok(());
        }
        if let Err(e) = transport.set_signal(signal) {
            error!(error = %e, "F_SETSIG failed");
            return Err(CtlError::sys("F_SETSIG", e));
        }
        if let Err(e) = transport.set_owner(owner) {
            error!(error = %e, "F_SETOWN failed");
            return Err(CtlError::sys("F_SETOWN", e));
        }
        Ok(())
    }

    fn subscribe_events(&mut self, subscribe: bool) -> Result<()> {
        let mut value: i32 = subscribe.into();
        self.exchange_logged(Op::SubscribeEvents, &mut value)
    }

    fn card_info(&mut self, info: &mut CardInfo) -> Result<()> {
        self.exchange_logged(Op::CardInfo, info)
    }

    fn elem_list(&mut self, list: &mut ElemList) -> Result<()> {
        let mut header = ElemListHeader {
            offset: list.offset,
            space: list.space() as u32,
            used: 0,
            count: 0,
            pids: list.ids_addr(),
            reserved: [0; 48],
        };
        self.exchange(Op::ElemList, &mut header)?;
        list.set_result(header.used, header.count);
        Ok(())
    }

    fn elem_info(&mut self, info: &mut ElemInfo) -> Result<()> {
        self.exchange(Op::ElemInfo, info)
    }

    fn elem_add(&mut self, info: &mut ElemInfo) -> Result<()> {
        if info.elem_type() == Some(ElemType::Enumerated) {
            self.requires_at_least(ENUM_ELEM_MIN_VERSION)?;
        }
        self.exchange(Op::ElemAdd, info)
    }

    fn elem_replace(&mut self, info: &mut ElemInfo) -> Result<()> {
        if info.elem_type() == Some(ElemType::Enumerated) {
            self.requires_at_least(ENUM_ELEM_MIN_VERSION)?;
        }
        self.exchange(Op::ElemReplace, info)
    }

    fn elem_remove(&mut self, id: &mut ElemId) -> Result<()> {
        self.exchange(Op::ElemRemove, id)
    }

    fn elem_read(&mut self, value: &mut ElemValue) -> Result<()> {
        self.exchange(Op::ElemRead, value)
    }

    fn elem_write(&mut self, value: &mut ElemValue) -> Result<()> {
        self.exchange(Op::ElemWrite, value)
    }

    fn elem_lock(&mut self, id: &mut ElemId) -> Result<()> {
        self.exchange(Op::ElemLock, id)
    }

    fn elem_unlock(&mut self, id: &mut ElemId) -> Result<()> {
        self.exchange(Op::ElemUnlock, id)
    }

    fn elem_tlv(&mut self, mode: TlvMode, numid: u32, buf: &mut [u32]) -> Result<()> {
        self.requires_at_least(TLV_MIN_VERSION)?;
        let transport = self.transport_mut()?;
        tlv::exchange(transport, mode, numid, buf)
    }

    fn hwdep_next_device(&mut self, device: i32) -> Result<i32> {
        let mut next = device;
        self.exchange(Op::HwdepNextDevice, &mut next)?;
        Ok(next)
    }

    fn hwdep_info(&mut self, info: &mut HwdepInfo) -> Result<()> {
        self.exchange(Op::HwdepInfo, info)
    }

    fn pcm_next_device(&mut self, device: i32) -> Result<i32> {
        let mut next = device;
        self.exchange(Op::PcmNextDevice, &mut next)?;
        Ok(next)
    }

    fn pcm_info(&mut self, info: &mut PcmInfo) -> Result<()> {
        self.exchange(Op::PcmInfo, info)?;
        if let Some(fixup) = &self.pcm_fixup {
            if fixup.applies(info) {
                return fixup.apply(info);
            }
        }
        Ok(())
    }

    fn pcm_prefer_subdevice(&mut self, subdevice: i32) -> Result<()> {
        let mut value = subdevice;
        self.exchange(Op::PcmPreferSubdevice, &mut value)
    }

    fn rawmidi_next_device(&mut self, device: i32) -> Result<i32> {
        let mut next = device;
        self.exchange(Op::RawmidiNextDevice, &mut next)?;
        Ok(next)
    }

    fn rawmidi_info(&mut self, info: &mut RawmidiInfo) -> Result<()> {
        self.exchange(Op::RawmidiInfo, info)
    }

    fn rawmidi_prefer_subdevice(&mut self, subdevice: i32) -> Result<()> {
        let mut value = subdevice;
        self.exchange(Op::RawmidiPreferSubdevice, &mut value)
    }

    fn set_power_state(&mut self, state: PowerState) -> Result<()> {
        let mut raw = state.raw();
        self.exchange(Op::Power, &mut raw)
    }

    fn power_state(&mut self) -> Result<PowerState> {
        let mut raw: u32 = 0;
        self.exchange(Op::PowerState, &mut raw)?;
        PowerState::from_raw(raw).ok_or_else(|| CtlError::InvalidArgument {
            reason: format!("unknown power state {raw:#06x}"),
        })
    }

    fn read_event(&mut self) -> Result<Option<Event>> {
        let transport = self.transport_mut()?;
        let mut event = Event::zeroed();
        let expected = std::mem::size_of::<Event>();
        match transport.read(event.as_bytes_mut()) {
            Ok(n) if n == expected => {
                metrics::counter!("klang.ctl.events").increment(1);
                Ok(Some(event))
            }
            Ok(0) => {
                Err(CtlError::sys("event read", io::Error::from(io::ErrorKind::UnexpectedEof)))
            }
            Ok(n) => Err(CtlError::UnexpectedEventSize { expected, got: n }),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(CtlError::sys("event read", e)),
        }
    }
}

impl<T: CtlTransport> Drop for HwControl<T> {
    fn drop(&mut self) {
        if let Some(transport) = self.transport.take() {
            let _ = transport.close();
        }
    }
}
