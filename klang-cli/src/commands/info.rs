//! `klang info` command

use super::open_card;
use anyhow::Result;
use klang_core::{CardInfo, ControlOps};

/// Show card information
pub fn info(card: u32) -> Result<()> {
    let mut ctl = open_card(card)?;

    let mut info = CardInfo::zeroed();
    ctl.card_info(&mut info)?;

    println!("{}", info);
    println!("  driver:     {}", info.driver_str());
    println!("  long name:  {}", info.longname_str());
    println!("  mixer:      {}", info.mixername_str());
    println!("  components: {}", info.components_str());
    println!("  protocol:   {}", ctl.version());

    Ok(())
}
