//! `klang elements` command

use super::open_card;
use anyhow::Result;
use klang_core::{ControlOps, ElemInfo, ElemList, ElemType};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ElemRow {
    #[tabled(rename = "NUMID")]
    numid: u32,
    #[tabled(rename = "IFACE")]
    iface: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "INDEX")]
    index: u32,
    #[tabled(rename = "TYPE")]
    elem_type: String,
    #[tabled(rename = "COUNT")]
    count: u32,
}

/// List all control elements on the card
pub fn elements(card: u32) -> Result<()> {
    let mut ctl = open_card(card)?;

    let mut probe = ElemList::new();
    ctl.elem_list(&mut probe)?;
    if probe.count() == 0 {
        println!("No elements on card {}", card);
        return Ok(());
    }

    let mut list = ElemList::with_space(probe.count());
    ctl.elem_list(&mut list)?;

    let mut rows = Vec::with_capacity(list.used());
    for id in list.ids() {
        let mut info = ElemInfo::new(*id, ElemType::None, 0);
        ctl.elem_info(&mut info)?;
        rows.push(ElemRow {
            numid: info.id.numid,
            iface: info
                .id
                .iface()
                .map(|i| i.to_string())
                .unwrap_or_else(|| info.id.interface.to_string()),
            name: info.id.name_str(),
            index: info.id.index,
            elem_type: info
                .elem_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string()),
            count: info.count,
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::modern());

    println!("{}", table);

    Ok(())
}
