//! CLI command implementations

mod devices;
mod elements;
mod info;
mod monitor;
mod read;

pub use devices::devices;
pub use elements::elements;
pub use info::info;
pub use monitor::monitor;
pub use read::read;

use anyhow::{Context, Result};
use klang_core::{HwCtl, OpenMode};

fn open_card(card: u32) -> Result<HwCtl> {
    HwCtl::open(card, OpenMode::READONLY)
        .with_context(|| format!("opening control node for card {}", card))
}
