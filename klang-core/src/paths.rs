//! Device node path layout.
//!
//! All device paths go through this module so the daemon, the CLI, and tests
//! agree on where control nodes live.

use std::path::PathBuf;

/// Default directory holding the sound device nodes.
pub const DEFAULT_DEVICE_DIR: &str = "/dev/snd";

/// Get the sound device directory.
///
/// Resolution order:
/// 1. `KLANG_DEVICE_DIR` environment variable
/// 2. `/dev/snd`
pub fn device_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("KLANG_DEVICE_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(DEFAULT_DEVICE_DIR)
}

/// Get the control node path for a card.
pub fn control_path(card: u32) -> PathBuf {
    device_dir().join(format!("controlC{}", card))
}
