//! `klang devices` command

use super::open_card;
use anyhow::Result;
use klang_core::{ControlOps, HwCtl, HwdepInfo, PcmInfo, RawmidiInfo};

/// List PCM, raw MIDI, and hwdep devices on the card
pub fn devices(card: u32) -> Result<()> {
    let mut ctl = open_card(card)?;
    list_pcm(&mut ctl)?;
    list_rawmidi(&mut ctl)?;
    list_hwdep(&mut ctl)?;
    Ok(())
}

fn list_pcm(ctl: &mut HwCtl) -> Result<()> {
    let mut device = ctl.pcm_next_device(-1)?;
    while device >= 0 {
        let mut info = PcmInfo::for_device(device as u32, 0);
        ctl.pcm_info(&mut info)?;
        println!(
            "pcm {}: {} [{}], {} subdevices",
            device,
            info.name_str(),
            info.id_str(),
            info.subdevices_count
        );
        device = ctl.pcm_next_device(device)?;
    }
    Ok(())
}

fn list_rawmidi(ctl: &mut HwCtl) -> Result<()> {
    let mut device = ctl.rawmidi_next_device(-1)?;
    while device >= 0 {
        let mut info = RawmidiInfo::for_device(device as u32, 0);
        ctl.rawmidi_info(&mut info)?;
        println!(
            "rawmidi {}: {} [{}], {} subdevices",
            device,
            info.name_str(),
            info.id_str(),
            info.subdevices_count
        );
        device = ctl.rawmidi_next_device(device)?;
    }
    Ok(())
}

fn list_hwdep(ctl: &mut HwCtl) -> Result<()> {
    let mut device = ctl.hwdep_next_device(-1)?;
    while device >= 0 {
        let mut info = HwdepInfo::for_device(device as u32);
        ctl.hwdep_info(&mut info)?;
        println!("hwdep {}: {} [{}]", device, info.name_str(), info.id_str());
        device = ctl.hwdep_next_device(device)?;
    }
    Ok(())
}
