// Copyright 2026 Phonedex Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CSV export of the phones currently loaded in memory.
//!
//! Export never pages through the server: exporting page one of a 927-match
//! search with a limit of 100 writes 100 rows.

use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;
use time::Date;

use crate::model::PhoneModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    pub rows: usize,
}

/// Header row, in `PhoneModel` field order.
pub const COLUMNS: [&str; 14] = [
    "name",
    "brand",
    "price",
    "ram",
    "battery",
    "screenSize",
    "weight",
    "year",
    "storage",
    "frontCamera",
    "backCamera",
    "processor",
    "displayType",
    "imageUrl",
];

pub fn export_csv(items: &[PhoneModel], writer: impl Write) -> Result<ExportStats> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for item in items {
        wtr.serialize(item)?;
    }
    wtr.flush()?;
    Ok(ExportStats { rows: items.len() })
}

pub fn default_export_name(date: Date) -> String {
    format!("phones-{date}.csv")
}
