//! Integration tests for the hardware control backend.
//!
//! The backend is driven through a scripted in-memory transport standing in
//! for the kernel driver, so every exchange, version gate, and size check is
//! observable without real hardware.

use klang_core::hw::{CtlTransport, Op};
use klang_core::{
    ControlOps, CtlError, ElemId, ElemIface, ElemInfo, ElemType, ElemValue, Event, HwControl,
    PcmInfo, PcmInfoFixup, PowerState, ProtocolVersion, TlvMode,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

fn cast_mut<T>(data: &mut [u8]) -> &mut T {
    assert_eq!(data.len(), std::mem::size_of::<T>());
    unsafe { &mut *(data.as_mut_ptr() as *mut T) }
}

fn words_mut(data: &mut [u8]) -> &mut [u32] {
    assert_eq!(data.len() % 4, 0);
    unsafe { std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut u32, data.len() / 4) }
}

/// One scripted outcome for an event read.
enum ReadStep {
    Deliver(Event),
    /// Return this many bytes without filling anything meaningful.
    Short(usize),
    Errno(i32),
}

#[derive(Default)]
struct FakeState {
    version: u32,
    calls: Vec<Op>,
    next_numid: u32,
    infos: Vec<ElemInfo>,
    values: HashMap<u32, ElemValue>,
    locked: HashSet<u32>,
    tlv: HashMap<u32, Vec<u32>>,
    /// Overrides the payload returned on TLV_READ when set.
    tlv_response: Option<Vec<u32>>,
    power: u32,
    subscribed: Option<i32>,
    flags: libc::c_int,
    signal: Option<i32>,
    owner: Option<libc::pid_t>,
    fail_signal: bool,
    /// Errno every ioctl fails with when set.
    fail_ioctl: Option<i32>,
    reads: VecDeque<ReadStep>,
    pcm_devices: Vec<i32>,
    closed: bool,
    dropped: bool,
}

/// Scripted stand-in for an open control node.
struct FakeCard {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCard {
    fn new(major: u32, minor: u32, patch: u32) -> (Self, Arc<Mutex<FakeState>>) {
        let state = Arc::new(Mutex::new(FakeState {
            version: ProtocolVersion::new(major, minor, patch).raw(),
            next_numid: 1,
            ..FakeState::default()
        }));
        (Self { state: state.clone() }, state)
    }

    fn find_info(state: &FakeState, id: &ElemId) -> Option<usize> {
        state.infos.iter().position(|info| {
            if id.numid != 0 {
                info.id.numid == id.numid
            } else {
                info.id.name == id.name && info.id.interface == id.interface
            }
        })
    }
}

impl Drop for FakeCard {
    fn drop(&mut self) {
        self.state.lock().unwrap().dropped = true;
    }
}

impl CtlTransport for FakeCard {
    fn ioctl(&mut self, op: Op, data: &mut [u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        if let Some(errno) = state.fail_ioctl {
            return Err(io::Error::from_raw_os_error(errno));
        }
        match op {
            Op::Pversion => {
                *cast_mut::<u32>(data) = state.version;
            }
            Op::ElemAdd => {
                let info = cast_mut::<ElemInfo>(data);
                info.id.numid = state.next_numid;
                state.next_numid += 1;
                let stored = info.clone();
                state.values.insert(stored.id.numid, ElemValue::new(stored.id));
                state.infos.push(stored);
            }
            Op::ElemInfo => {
                let info = cast_mut::<ElemInfo>(data);
                match Self::find_info(&state, &info.id) {
                    Some(idx) => *info = state.infos[idx].clone(),
                    None => return Err(io::Error::from_raw_os_error(libc::ENOENT)),
                }
            }
            Op::ElemRemove => {
                let id = cast_mut::<ElemId>(data);
                match Self::find_info(&state, id) {
                    Some(idx) => {
                        let removed = state.infos.remove(idx);
                        state.values.remove(&removed.id.numid);
                    }
                    None => return Err(io::Error::from_raw_os_error(libc::ENOENT)),
                }
            }
            Op::ElemRead => {
                let value = cast_mut::<ElemValue>(data);
                match state.values.get(&value.id.numid) {
                    Some(stored) => *value = stored.clone(),
                    None => return Err(io::Error::from_raw_os_error(libc::ENOENT)),
                }
            }
            Op::ElemWrite => {
                let value = cast_mut::<ElemValue>(data);
                if !state.values.contains_key(&value.id.numid) {
                    return Err(io::Error::from_raw_os_error(libc::ENOENT));
                }
                let stored = value.clone();
                state.values.insert(stored.id.numid, stored);
            }
            Op::ElemLock => {
                let id = cast_mut::<ElemId>(data);
                state.locked.insert(id.numid);
            }
            Op::ElemUnlock => {
                let id = cast_mut::<ElemId>(data);
                state.locked.remove(&id.numid);
            }
            Op::ElemList => {
                let header = cast_mut::<klang_core::types::ElemListHeader>(data);
                header.count = state.infos.len() as u32;
                let offset = header.offset as usize;
                let avail = state.infos.len().saturating_sub(offset);
                let used = avail.min(header.space as usize);
                header.used = used as u32;
                if header.pids != 0 {
                    let ids = header.pids as *mut ElemId;
                    for (i, info) in state.infos[offset..offset + used].iter().enumerate() {
                        unsafe { ids.add(i).write(info.id) };
                    }
                }
            }
            Op::SubscribeEvents => {
                state.subscribed = Some(*cast_mut::<i32>(data));
            }
            Op::Power => {
                state.power = *cast_mut::<u32>(data);
            }
            Op::PowerState => {
                *cast_mut::<u32>(data) = state.power;
            }
            Op::TlvWrite | Op::TlvCommand => {
                let words = words_mut(data);
                let numid = words[0];
                let payload = words[2..].to_vec();
                state.tlv.insert(numid, payload);
            }
            Op::TlvRead => {
                let words = words_mut(data);
                let numid = words[0];
                let response = state
                    .tlv_response
                    .clone()
                    .or_else(|| state.tlv.get(&numid).cloned())
                    .unwrap_or_default();
                let n = response.len().min(words.len() - 2);
                words[2..2 + n].copy_from_slice(&response[..n]);
            }
            Op::PcmNextDevice | Op::HwdepNextDevice | Op::RawmidiNextDevice => {
                let device = cast_mut::<i32>(data);
                *device = state
                    .pcm_devices
                    .iter()
                    .copied()
                    .find(|d| *d > *device)
                    .unwrap_or(-1);
            }
            Op::PcmInfo => {
                let info = cast_mut::<PcmInfo>(data);
                info.card = 0;
                info.dev_class = 7;
                info.subdevices_count = 1;
            }
            _ => {}
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        match state.reads.pop_front() {
            Some(ReadStep::Deliver(event)) => {
                let bytes = unsafe {
                    std::slice::from_raw_parts(
                        &event as *const Event as *const u8,
                        std::mem::size_of::<Event>(),
                    )
                };
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            Some(ReadStep::Short(n)) => Ok(n),
            Some(ReadStep::Errno(errno)) => Err(io::Error::from_raw_os_error(errno)),
            None => Err(io::Error::from_raw_os_error(libc::EAGAIN)),
        }
    }

    fn flags(&mut self) -> io::Result<libc::c_int> {
        Ok(self.state.lock().unwrap().flags)
    }

    fn set_flags(&mut self, flags: libc::c_int) -> io::Result<()> {
        self.state.lock().unwrap().flags = flags;
        Ok(())
    }

    fn set_signal(&mut self, signal: libc::c_int) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_signal {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        state.signal = Some(signal);
        Ok(())
    }

    fn set_owner(&mut self, owner: libc::pid_t) -> io::Result<()> {
        self.state.lock().unwrap().owner = Some(owner);
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

fn open_fake(major: u32, minor: u32, patch: u32) -> (HwControl<FakeCard>, Arc<Mutex<FakeState>>) {
    let (card, state) = FakeCard::new(major, minor, patch);
    let ctl = HwControl::from_transport(0, card).unwrap();
    (ctl, state)
}

fn add_integer_elem(ctl: &mut HwControl<FakeCard>, name: &str, count: u32) -> ElemId {
    let id = ElemId::named(ElemIface::Mixer, name);
    let mut info = ElemInfo::new(id, ElemType::Integer, count);
    info.set_integer_range(-100, 100, 1);
    ctl.elem_add(&mut info).unwrap();
    info.id
}

#[test]
fn test_open_stores_reported_version() {
    let (ctl, state) = open_fake(2, 0, 4);
    assert_eq!(ctl.version(), ProtocolVersion::new(2, 0, 4));
    assert_eq!(ctl.card(), 0);
    assert_eq!(state.lock().unwrap().calls, vec![Op::Pversion]);
}

#[test]
fn test_incompatible_version_rejected_without_leak() {
    for (major, minor, patch) in [(1, 0, 4), (3, 0, 0), (2, 0, 5), (2, 1, 0)] {
        let (card, state) = FakeCard::new(major, minor, patch);
        let err = HwControl::from_transport(0, card).unwrap_err();
        assert!(matches!(err, CtlError::IncompatibleVersion { .. }), "{major}.{minor}.{patch}");
        assert!(state.lock().unwrap().dropped, "transport leaked for {major}.{minor}.{patch}");
    }
}

#[test]
fn test_version_query_failure_rejected_without_leak() {
    let (card, state) = FakeCard::new(2, 0, 4);
    state.lock().unwrap().fail_ioctl = Some(libc::EACCES);
    let err = HwControl::from_transport(0, card).unwrap_err();
    assert_eq!(err.os_error(), Some(libc::EACCES));
    assert!(state.lock().unwrap().dropped);
}

#[test]
fn test_element_lifecycle_scenario() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    assert_eq!(ctl.version(), ProtocolVersion::new(2, 0, 4));

    let id = add_integer_elem(&mut ctl, "Master Playback Volume", 2);
    assert_eq!(id.numid, 1);

    let mut value = ElemValue::new(id);
    ctl.elem_read(&mut value).unwrap();
    assert_eq!(value.integer(0), 0);

    value.set_integer(0, -5);
    value.set_integer(1, 10);
    ctl.elem_write(&mut value).unwrap();

    let mut reread = ElemValue::new(id);
    ctl.elem_read(&mut reread).unwrap();
    assert_eq!(reread.integer(0), -5);
    assert_eq!(reread.integer(1), 10);

    ctl.close().unwrap();
    assert!(state.lock().unwrap().closed);
    assert!(matches!(ctl.elem_read(&mut reread), Err(CtlError::Closed)));
    assert!(matches!(ctl.close(), Err(CtlError::Closed)));
}

#[test]
fn test_closed_handle_fails_every_capability() {
    let (mut ctl, _state) = open_fake(2, 0, 4);
    ctl.close().unwrap();

    let mut info = ElemInfo::zeroed();
    let mut id = ElemId::by_numid(1);
    let mut card_info = klang_core::CardInfo::zeroed();
    let mut buf = [0u32; 4];
    assert!(matches!(ctl.card_info(&mut card_info), Err(CtlError::Closed)));
    assert!(matches!(ctl.elem_info(&mut info), Err(CtlError::Closed)));
    assert!(matches!(ctl.elem_lock(&mut id), Err(CtlError::Closed)));
    assert!(matches!(ctl.elem_tlv(TlvMode::Read, 1, &mut buf), Err(CtlError::Closed)));
    assert!(matches!(ctl.subscribe_events(true), Err(CtlError::Closed)));
    assert!(matches!(ctl.read_event(), Err(CtlError::Closed)));
    assert!(matches!(ctl.set_nonblocking(true), Err(CtlError::Closed)));
    assert!(matches!(ctl.power_state(), Err(CtlError::Closed)));
    assert!(matches!(ctl.pcm_next_device(-1), Err(CtlError::Closed)));
}

#[test]
fn test_enumerated_add_gated_before_any_exchange() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    let mut info = ElemInfo::new(ElemId::named(ElemIface::Mixer, "Capture Source"), ElemType::Enumerated, 1);
    info.set_items(3);

    let err = ctl.elem_add(&mut info).unwrap_err();
    assert!(matches!(err, CtlError::NotSupported { .. }));
    let err = ctl.elem_replace(&mut info).unwrap_err();
    assert!(matches!(err, CtlError::NotSupported { .. }));

    // Only the version negotiation reached the transport.
    assert_eq!(state.lock().unwrap().calls, vec![Op::Pversion]);

    // Non-enumerated kinds are not gated.
    let mut plain = ElemInfo::new(ElemId::named(ElemIface::Mixer, "PCM Playback Volume"), ElemType::Integer, 1);
    ctl.elem_add(&mut plain).unwrap();
    assert_eq!(state.lock().unwrap().calls, vec![Op::Pversion, Op::ElemAdd]);
}

#[test]
fn test_tlv_gated_below_min_version() {
    let (mut ctl, state) = open_fake(2, 0, 3);
    let mut buf = [0u32; 4];
    let err = ctl.elem_tlv(TlvMode::Read, 1, &mut buf).unwrap_err();
    assert!(matches!(err, CtlError::NotSupported { .. }));
    assert_eq!(state.lock().unwrap().calls, vec![Op::Pversion]);
}

#[test]
fn test_tlv_write_read_round_trip() {
    let (mut ctl, _state) = open_fake(2, 0, 4);
    let id = add_integer_elem(&mut ctl, "Master Playback Volume", 1);

    // Payload: type tag, declared data length in bytes, two data words.
    let mut payload = [0x0001u32, 8, 0xdead_0001, 0xdead_0002];
    ctl.elem_tlv(TlvMode::Write, id.numid, &mut payload).unwrap();

    let mut readback = [0u32; 4];
    ctl.elem_tlv(TlvMode::Read, id.numid, &mut readback).unwrap();
    assert_eq!(readback, payload);
}

#[test]
fn test_tlv_read_exceeding_capacity_fails_clean() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    // Device declares 64 data bytes; the caller only has 16 bytes of room.
    state.lock().unwrap().tlv_response = Some(vec![0x0001, 64]);

    let mut buf = [0x5a5a_5a5au32; 4];
    let err = ctl.elem_tlv(TlvMode::Read, 1, &mut buf).unwrap_err();
    assert!(matches!(err, CtlError::TlvTooLarge { needed: 72, capacity: 16 }));
    assert_eq!(buf, [0x5a5a_5a5au32; 4]);
}

#[test]
fn test_event_read_outcomes() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    ctl.subscribe_events(true).unwrap();
    assert_eq!(state.lock().unwrap().subscribed, Some(1));

    let mut event = Event::zeroed();
    event.mask = klang_core::types::event::mask::VALUE;
    event.id = ElemId::by_numid(9);
    state.lock().unwrap().reads.push_back(ReadStep::Deliver(event));

    let delivered = ctl.read_event().unwrap().unwrap();
    assert_eq!(delivered.mask, klang_core::types::event::mask::VALUE);
    assert_eq!(delivered.id.numid, 9);

    // Short read is protocol corruption, never truncated or accepted.
    state.lock().unwrap().reads.push_back(ReadStep::Short(10));
    let err = ctl.read_event().unwrap_err();
    assert!(matches!(err, CtlError::UnexpectedEventSize { expected: 72, got: 10 }));

    // Zero-length read is a system error.
    state.lock().unwrap().reads.push_back(ReadStep::Short(0));
    assert!(matches!(ctl.read_event(), Err(CtlError::Sys { .. })));

    // Would-block means no event, not a failure.
    state.lock().unwrap().reads.push_back(ReadStep::Errno(libc::EAGAIN));
    assert!(ctl.read_event().unwrap().is_none());

    // Any other errno surfaces untranslated.
    state.lock().unwrap().reads.push_back(ReadStep::Errno(libc::EIO));
    assert_eq!(ctl.read_event().unwrap_err().os_error(), Some(libc::EIO));
}

#[test]
fn test_set_nonblocking_preserves_unrelated_flags() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    state.lock().unwrap().flags = libc::O_RDWR | libc::O_APPEND;

    ctl.set_nonblocking(true).unwrap();
    {
        let flags = state.lock().unwrap().flags;
        assert_eq!(flags & libc::O_NONBLOCK, libc::O_NONBLOCK);
        assert_eq!(flags & libc::O_APPEND, libc::O_APPEND);
    }

    ctl.set_nonblocking(false).unwrap();
    let flags = state.lock().unwrap().flags;
    assert_eq!(flags & libc::O_NONBLOCK, 0);
    assert_eq!(flags & libc::O_APPEND, libc::O_APPEND);
}

#[test]
fn test_set_async_arms_signal_and_owner() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    ctl.set_async(40, 1234).unwrap();
    {
        let state = state.lock().unwrap();
        assert_eq!(state.flags & libc::O_ASYNC, libc::O_ASYNC);
        assert_eq!(state.signal, Some(40));
        assert_eq!(state.owner, Some(1234));
    }

    // Negative signal disables delivery and skips the signal/owner steps.
    let (mut ctl, state) = open_fake(2, 0, 4);
    ctl.set_async(-1, 0).unwrap();
    let state = state.lock().unwrap();
    assert_eq!(state.flags & libc::O_ASYNC, 0);
    assert_eq!(state.signal, None);
    assert_eq!(state.owner, None);
}

#[test]
fn test_set_async_step_failure_stops_without_rollback() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    state.lock().unwrap().fail_signal = true;

    let err = ctl.set_async(40, 1234).unwrap_err();
    assert_eq!(err.os_error(), Some(libc::EINVAL));

    let state = state.lock().unwrap();
    // The mode flag step already happened and stays; the owner step was
    // never attempted.
    assert_eq!(state.flags & libc::O_ASYNC, libc::O_ASYNC);
    assert_eq!(state.owner, None);
}

#[test]
fn test_elem_list_count_and_paging() {
    let (mut ctl, _state) = open_fake(2, 0, 4);
    for name in ["A", "B", "C"] {
        add_integer_elem(&mut ctl, name, 1);
    }

    let mut count_only = klang_core::ElemList::new();
    ctl.elem_list(&mut count_only).unwrap();
    assert_eq!(count_only.count(), 3);
    assert_eq!(count_only.used(), 0);

    let mut page = klang_core::ElemList::with_space(2);
    page.offset = 1;
    ctl.elem_list(&mut page).unwrap();
    assert_eq!(page.count(), 3);
    assert_eq!(page.used(), 2);
    assert_eq!(page.ids()[0].numid, 2);
    assert_eq!(page.ids()[1].numid, 3);
}

#[test]
fn test_elem_list_error_passthrough() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    state.lock().unwrap().fail_ioctl = Some(libc::ENOMEM);
    let mut list = klang_core::ElemList::new();
    assert_eq!(ctl.elem_list(&mut list).unwrap_err().os_error(), Some(libc::ENOMEM));
}

#[test]
fn test_elem_identity_round_trips_through_info_and_remove() {
    let (mut ctl, _state) = open_fake(2, 0, 4);
    let id = add_integer_elem(&mut ctl, "Headphone Playback Switch", 1);

    let mut info = ElemInfo::new(ElemId::named(ElemIface::Mixer, "Headphone Playback Switch"), ElemType::None, 0);
    ctl.elem_info(&mut info).unwrap();
    assert_eq!(info.id, id);
    assert_eq!(info.elem_type(), Some(ElemType::Integer));
    assert_eq!(info.integer_range(), (-100, 100, 1));

    let mut remove_id = id;
    ctl.elem_remove(&mut remove_id).unwrap();

    let mut value = ElemValue::new(id);
    assert_eq!(ctl.elem_read(&mut value).unwrap_err().os_error(), Some(libc::ENOENT));
}

#[test]
fn test_elem_lock_unlock() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    let id = add_integer_elem(&mut ctl, "Mic Boost", 1);

    let mut lock_id = id;
    ctl.elem_lock(&mut lock_id).unwrap();
    assert!(state.lock().unwrap().locked.contains(&id.numid));

    ctl.elem_unlock(&mut lock_id).unwrap();
    assert!(!state.lock().unwrap().locked.contains(&id.numid));
}

#[test]
fn test_power_state_round_trip() {
    let (mut ctl, _state) = open_fake(2, 0, 4);
    assert_eq!(ctl.power_state().unwrap(), PowerState::D0);
    ctl.set_power_state(PowerState::D3Hot).unwrap();
    assert_eq!(ctl.power_state().unwrap(), PowerState::D3Hot);
}

#[test]
fn test_next_device_iteration() {
    let (mut ctl, state) = open_fake(2, 0, 4);
    state.lock().unwrap().pcm_devices = vec![0, 1];

    assert_eq!(ctl.pcm_next_device(-1).unwrap(), 0);
    assert_eq!(ctl.pcm_next_device(0).unwrap(), 1);
    assert_eq!(ctl.pcm_next_device(1).unwrap(), -1);

    ctl.pcm_prefer_subdevice(0).unwrap();
    ctl.rawmidi_prefer_subdevice(1).unwrap();

    let mut hwdep = klang_core::HwdepInfo::for_device(0);
    ctl.hwdep_info(&mut hwdep).unwrap();
    let mut rawmidi = klang_core::RawmidiInfo::for_device(0, 0);
    ctl.rawmidi_info(&mut rawmidi).unwrap();

    let state = state.lock().unwrap();
    for op in [Op::PcmPreferSubdevice, Op::RawmidiPreferSubdevice, Op::HwdepInfo, Op::RawmidiInfo] {
        assert!(state.calls.contains(&op));
    }
}

struct ClassFixup;

impl PcmInfoFixup for ClassFixup {
    fn applies(&self, info: &PcmInfo) -> bool {
        info.dev_class == 7
    }

    fn apply(&self, info: &mut PcmInfo) -> klang_core::Result<()> {
        info.dev_class = 99;
        Ok(())
    }
}

#[test]
fn test_pcm_info_fixup_hook() {
    // Without a hook the raw descriptor is returned untouched.
    let (mut ctl, _state) = open_fake(2, 0, 4);
    let mut info = PcmInfo::for_device(0, 0);
    ctl.pcm_info(&mut info).unwrap();
    assert_eq!(info.dev_class, 7);

    // With the hook installed, the correction is layered on the response.
    let (mut ctl, _state) = open_fake(2, 0, 4);
    ctl.set_pcm_info_fixup(Box::new(ClassFixup));
    let mut info = PcmInfo::for_device(0, 0);
    ctl.pcm_info(&mut info).unwrap();
    assert_eq!(info.dev_class, 99);
}
