//! `klang read` command

use super::open_card;
use anyhow::Result;
use klang_core::{ControlOps, ElemId, ElemInfo, ElemType, ElemValue};

/// Read and print one element value
pub fn read(card: u32, numid: u32) -> Result<()> {
    let mut ctl = open_card(card)?;

    let mut info = ElemInfo::new(ElemId::by_numid(numid), ElemType::None, 0);
    ctl.elem_info(&mut info)?;

    let mut value = ElemValue::new(info.id);
    ctl.elem_read(&mut value)?;

    println!("{}", info.id);
    let payload = value.bytes().len();
    match info.elem_type() {
        Some(ElemType::Boolean) => {
            let count = (info.count as usize).min(payload / 8);
            let values: Vec<&str> =
                (0..count).map(|i| if value.integer(i) != 0 { "on" } else { "off" }).collect();
            println!("  boolean: {}", values.join(","));
        }
        Some(ElemType::Integer) | Some(ElemType::Integer64) => {
            let count = (info.count as usize).min(payload / 8);
            let (min, max, step) = info.integer_range();
            let values: Vec<String> = (0..count).map(|i| value.integer(i).to_string()).collect();
            println!("  integer: {} (min={} max={} step={})", values.join(","), min, max, step);
        }
        Some(ElemType::Enumerated) => {
            let count = (info.count as usize).min(payload / 4);
            let values: Vec<String> =
                (0..count).map(|i| value.enumerated(i).to_string()).collect();
            println!("  enumerated: {} of {} items", values.join(","), info.items());
        }
        Some(ElemType::Bytes) => {
            let count = (info.count as usize).min(payload);
            let bytes: Vec<String> =
                value.bytes()[..count].iter().map(|b| format!("{:02x}", b)).collect();
            println!("  bytes: {}", bytes.join(" "));
        }
        _ => {
            println!("  (opaque payload)");
        }
    }

    Ok(())
}
