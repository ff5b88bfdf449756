//! `klang monitor` command

use super::open_card;
use anyhow::Result;
use klang_core::types::event::mask;
use klang_core::ControlOps;

/// Print change events as the card delivers them
pub fn monitor(card: u32) -> Result<()> {
    let mut ctl = open_card(card)?;
    ctl.subscribe_events(true)?;

    println!("Monitoring card {}, press Ctrl-C to stop", card);
    loop {
        let Some(event) = ctl.read_event()? else {
            continue;
        };
        if event.mask == mask::REMOVE {
            println!("removed  {}", event.id);
        } else {
            println!("{:8} {}", mask_str(event.mask), event.id);
        }
    }
}

fn mask_str(value: u32) -> String {
    let mut parts = Vec::new();
    if value & mask::VALUE != 0 {
        parts.push("value");
    }
    if value & mask::INFO != 0 {
        parts.push("info");
    }
    if value & mask::ADD != 0 {
        parts.push("add");
    }
    if value & mask::TLV != 0 {
        parts.push("tlv");
    }
    if parts.is_empty() {
        parts.push("none");
    }
    parts.join("+")
}
