//! Control node opener.
//!
//! Opens `controlC<card>` under the device directory. A failed first attempt
//! triggers the card-materialization collaborator and retries exactly once;
//! this covers a card whose node has not been instantiated yet and is not a
//! generic retry policy.

use crate::error::{CtlError, Result};
use crate::ops::OpenMode;
use crate::paths;
use std::ffi::CString;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tracing::debug;

/// Highest card count a system can expose.
pub const MAX_CARDS: u32 = 32;

/// External hook that may cause an absent card node to appear.
///
/// Best-effort and side-effecting; the opener retries the open once after
/// invoking it, whatever it did.
pub trait CardLoader {
    fn load(&self, card: u32);
}

/// Loader that does nothing; used when no materialization hook is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLoader;

impl CardLoader for NoopLoader {
    fn load(&self, _card: u32) {}
}

/// Open the control node for `card`, retrying once after materialization.
pub(crate) fn open_card(card: u32, mode: OpenMode, loader: &dyn CardLoader) -> Result<OwnedFd> {
    if card >= MAX_CARDS {
        return Err(CtlError::InvalidCard { card, max: MAX_CARDS });
    }
    let path = paths::control_path(card);
    match open_node(&path, mode) {
        Ok(fd) => Ok(fd),
        Err(first) => {
            debug!(card, path = %path.display(), error = %first, "control node open failed, triggering card load");
            loader.load(card);
            metrics::counter!("klang.ctl.open_retries").increment(1);
            open_node(&path, mode).map_err(|e| CtlError::sys("open", e))
        }
    }
}

fn open_node(path: &Path, mode: OpenMode) -> io::Result<OwnedFd> {
    let cpath = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "device path contains NUL"))?;
    let fd = unsafe { libc::open(cpath.as_ptr(), mode.to_oflags()) };
    if fd < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }
}
