use crate::mappings::Mappings;
use crate::template::{pad_identifier, BlockBuilder};

/// Parameters for a printer destination block.
#[derive(Debug, Clone)]
pub struct PrinterDestination<'a> {
    pub queue: &'a str,
    pub store_number: &'a str,
    pub store_name: &'a str,
    pub address: &'a str,
    pub city_state_zip: &'a str,
    /// Copy group, usually `001`.
    pub copy_num: &'a str,
}

impl<'a> PrinterDestination<'a> {
    pub fn new(queue: &'a str, store_number: &'a str) -> Self {
        Self {
            queue,
            store_number,
            store_name: "",
            address: "",
            city_state_zip: "",
            copy_num: "001",
        }
    }
}

/// Render a print-server destination stanza for a store.
pub fn printer_destination(params: &PrinterDestination<'_>, mappings: &Mappings) -> String {
    let PrinterDestination {
        queue,
        store_number,
        store_name,
        address,
        city_state_zip,
        copy_num,
    } = params;

    BlockBuilder::new("DESTINATION")
        .field("NAME", format!("{queue}~STORE{store_number}~{copy_num}"))
        .field("TYPE", "Print Server")
        .field("PRINTSERVER", "vpsx")
        .field("PRINTERNAME", mappings.printer_name(queue))
        .field("FILENAME", "&FILEPRE")
        .field("COPIES", "2")
        .field("TITLE", "&ADVREPORTDESC")
        .field("CLASS", format!("&RPT_{queue}_CLASS"))
        .field("FORM", format!("&RPT_{queue}_FORM"))
        .field("JOBNAME", "&RPT_WRITER")
        .field(
            "USERDATA4",
            format!("OU=&RPT_{queue}_OUTPUT PA=&RPT_DFLTJ_PAGEFMT"),
        )
        .field(
            "USERDATA5",
            format!("CO=&RPT_{queue}_CPYGRP CH=&RPT_DFLTJ_CHARS"),
        )
        .field(
            "USERDATA6",
            format!("{store_number}(GP)STORE{store_number}"),
        )
        .field("USERDATA10", format!("FLASH=&RPT_{queue}_FLASH"))
        .field("USERDATA11", *store_name)
        .field("USERDATA12", *address)
        .field("USERDATA14", *city_state_zip)
        .field("USERDATA15", "_")
        .render()
}

/// Render a folder destination stanza (`/Reports/<report>-<job>~<id>/`).
pub fn folder_destination(report: &str, job: &str, identifier: &str) -> String {
    let id = pad_identifier(identifier);
    let path = format!("/Reports/{report}-{job}~{id}/");

    BlockBuilder::new("DESTINATION")
        .field("NAME", &path)
        .field("TYPE", "Folder")
        .field("IMPORTFOLDERPATH", &path)
        .field("DOCUMENTNAME", "&ADVREPORT.&FILETYPE")
        .field("TITLE", "&ADVREPORTDESC")
        .render()
}
