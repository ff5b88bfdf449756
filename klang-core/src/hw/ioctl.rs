//! Raw device exchange layer.
//!
//! Every control capability maps to one operation code, encoded with the
//! kernel `_IOC` convention under the `'U'` magic. [`DevTransport`] is the
//! real file-descriptor-backed transport; tests substitute their own
//! [`CtlTransport`] implementations.

use crate::types::{
    CardInfo, ElemId, ElemInfo, ElemListHeader, ElemValue, Event, HwdepInfo, PcmInfo, RawmidiInfo,
};
use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
use static_assertions::const_assert_eq;

// The exchange layer reads records as raw byte blocks, so their layouts must
// be exactly the declared field widths with no compiler-inserted padding.
const_assert_eq!(size_of::<ElemId>(), 64);
const_assert_eq!(size_of::<ElemInfo>(), 272);
const_assert_eq!(size_of::<ElemValue>(), 576);
const_assert_eq!(size_of::<ElemListHeader>(), 72);
const_assert_eq!(size_of::<CardInfo>(), 356);
const_assert_eq!(size_of::<HwdepInfo>(), 220);
const_assert_eq!(size_of::<PcmInfo>(), 272);
const_assert_eq!(size_of::<RawmidiInfo>(), 268);
const_assert_eq!(size_of::<Event>(), 72);
const_assert_eq!(size_of::<TlvHeader>(), 8);

/// Wire header of a TLV transmission block. The payload follows immediately.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct TlvHeader {
    pub numid: u32,
    /// Payload length in bytes.
    pub length: u32,
}

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;
const MAGIC: u32 = b'U' as u32;

const fn ioc(dir: u32, nr: u32, size: u32) -> u32 {
    (dir << 30) | (size << 16) | (MAGIC << 8) | nr
}

const fn ior<T>(nr: u32) -> u32 {
    ioc(IOC_READ, nr, size_of::<T>() as u32)
}

const fn iow<T>(nr: u32) -> u32 {
    ioc(IOC_WRITE, nr, size_of::<T>() as u32)
}

const fn iowr<T>(nr: u32) -> u32 {
    ioc(IOC_READ | IOC_WRITE, nr, size_of::<T>() as u32)
}

/// Control protocol operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Pversion,
    CardInfo,
    ElemList,
    ElemInfo,
    ElemAdd,
    ElemReplace,
    ElemRemove,
    ElemRead,
    ElemWrite,
    ElemLock,
    ElemUnlock,
    TlvRead,
    TlvWrite,
    TlvCommand,
    SubscribeEvents,
    HwdepNextDevice,
    HwdepInfo,
    PcmNextDevice,
    PcmInfo,
    PcmPreferSubdevice,
    RawmidiNextDevice,
    RawmidiInfo,
    RawmidiPreferSubdevice,
    Power,
    PowerState,
}

impl Op {
    /// The ioctl request code for this operation.
    pub const fn code(self) -> libc::c_ulong {
        let code = match self {
            Self::Pversion => ior::<i32>(0x00),
            Self::CardInfo => ior::<CardInfo>(0x01),
            Self::ElemList => iowr::<ElemListHeader>(0x10),
            Self::ElemInfo => iowr::<ElemInfo>(0x11),
            Self::ElemRead => iowr::<ElemValue>(0x12),
            Self::ElemWrite => iowr::<ElemValue>(0x13),
            Self::ElemLock => iow::<ElemId>(0x14),
            Self::ElemUnlock => iow::<ElemId>(0x15),
            Self::SubscribeEvents => iowr::<i32>(0x16),
            Self::ElemAdd => iowr::<ElemInfo>(0x17),
            Self::ElemReplace => iowr::<ElemInfo>(0x18),
            Self::ElemRemove => iowr::<ElemId>(0x19),
            Self::TlvRead => iowr::<TlvHeader>(0x1a),
            Self::TlvWrite => iowr::<TlvHeader>(0x1b),
            Self::TlvCommand => iowr::<TlvHeader>(0x1c),
            Self::HwdepNextDevice => iowr::<i32>(0x20),
            Self::HwdepInfo => ior::<HwdepInfo>(0x21),
            Self::PcmNextDevice => ior::<i32>(0x30),
            Self::PcmInfo => iowr::<PcmInfo>(0x31),
            Self::PcmPreferSubdevice => iow::<i32>(0x32),
            Self::RawmidiNextDevice => iowr::<i32>(0x40),
            Self::RawmidiInfo => iowr::<RawmidiInfo>(0x41),
            Self::RawmidiPreferSubdevice => iow::<i32>(0x42),
            Self::Power => iowr::<i32>(0xd0),
            Self::PowerState => ior::<i32>(0xd1),
        };
        code as libc::c_ulong
    }

    /// Protocol name, for logs and error context.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pversion => "PVERSION",
            Self::CardInfo => "CARD_INFO",
            Self::ElemList => "ELEM_LIST",
            Self::ElemInfo => "ELEM_INFO",
            Self::ElemAdd => "ELEM_ADD",
            Self::ElemReplace => "ELEM_REPLACE",
            Self::ElemRemove => "ELEM_REMOVE",
            Self::ElemRead => "ELEM_READ",
            Self::ElemWrite => "ELEM_WRITE",
            Self::ElemLock => "ELEM_LOCK",
            Self::ElemUnlock => "ELEM_UNLOCK",
            Self::TlvRead => "TLV_READ",
            Self::TlvWrite => "TLV_WRITE",
            Self::TlvCommand => "TLV_COMMAND",
            Self::SubscribeEvents => "SUBSCRIBE_EVENTS",
            Self::HwdepNextDevice => "HWDEP_NEXT_DEVICE",
            Self::HwdepInfo => "HWDEP_INFO",
            Self::PcmNextDevice => "PCM_NEXT_DEVICE",
            Self::PcmInfo => "PCM_INFO",
            Self::PcmPreferSubdevice => "PCM_PREFER_SUBDEVICE",
            Self::RawmidiNextDevice => "RAWMIDI_NEXT_DEVICE",
            Self::RawmidiInfo => "RAWMIDI_INFO",
            Self::RawmidiPreferSubdevice => "RAWMIDI_PREFER_SUBDEVICE",
            Self::Power => "POWER",
            Self::PowerState => "POWER_STATE",
        }
    }
}

/// Fixed-layout record exchanged whole with the device.
///
/// # Safety
/// Implementors must be `#[repr(C)]` (or a primitive scalar) with no padding
/// bytes, so the byte view covers only initialized memory.
pub(crate) unsafe trait Wire: Sized {
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = size_of::<Self>();
        unsafe { std::slice::from_raw_parts_mut((self as *mut Self).cast(), len) }
    }
}

unsafe impl Wire for i32 {}
unsafe impl Wire for u32 {}
unsafe impl Wire for ElemId {}
unsafe impl Wire for ElemInfo {}
unsafe impl Wire for ElemValue {}
unsafe impl Wire for ElemListHeader {}
unsafe impl Wire for CardInfo {}
unsafe impl Wire for HwdepInfo {}
unsafe impl Wire for PcmInfo {}
unsafe impl Wire for RawmidiInfo {}
unsafe impl Wire for Event {}

/// Raw exchange surface of one open control node.
///
/// The hardware backend is generic over this trait so tests can drive it with
/// scripted or call-counting stand-ins.
pub trait CtlTransport {
    /// Issue one protocol exchange. `data` is the full record, read and
    /// written in place.
    fn ioctl(&mut self, op: Op, data: &mut [u8]) -> io::Result<()>;

    /// Read raw bytes from the handle (event delivery).
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Current handle status flags.
    fn flags(&mut self) -> io::Result<libc::c_int>;

    /// Replace the handle status flags.
    fn set_flags(&mut self, flags: libc::c_int) -> io::Result<()>;

    /// Arm the signal delivered on async notification.
    fn set_signal(&mut self, signal: libc::c_int) -> io::Result<()>;

    /// Assign the process receiving async notification signals.
    fn set_owner(&mut self, owner: libc::pid_t) -> io::Result<()>;

    /// Release the handle.
    fn close(self) -> io::Result<()>;
}

// Not exported by libc for every target; fixed value on Linux.
const F_SETSIG: libc::c_int = 10;

/// File-descriptor-backed transport over an open control node.
#[derive(Debug)]
pub struct DevTransport {
    fd: OwnedFd,
}

impl DevTransport {
    pub(crate) fn new(fd: OwnedFd) -> Self {
        Self { fd }
    }
}

impl CtlTransport for DevTransport {
    fn ioctl(&mut self, op: Op, data: &mut [u8]) -> io::Result<()> {
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), op.code(), data.as_mut_ptr()) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn flags(&mut self) -> io::Result<libc::c_int> {
        let flags = unsafe { libc::fcntl(self.fd.as_raw_fd(), libc::F_GETFL) };
        if flags < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(flags)
        }
    }

    fn set_flags(&mut self, flags: libc::c_int) -> io::Result<()> {
        let rc = unsafe { libc::fcntl(self.fd.as_raw_fd(), libc::F_SETFL, flags) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn set_signal(&mut self, signal: libc::c_int) -> io::Result<()> {
        let rc = unsafe { libc::fcntl(self.fd.as_raw_fd(), F_SETSIG, signal as libc::c_long) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn set_owner(&mut self, owner: libc::pid_t) -> io::Result<()> {
        let rc = unsafe { libc::fcntl(self.fd.as_raw_fd(), libc::F_SETOWN, owner as libc::c_long) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn close(self) -> io::Result<()> {
        let fd = self.fd.into_raw_fd();
        let rc = unsafe { libc::close(fd) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
