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

//! Filter state and its canonical query-parameter form.
//!
//! The store performs no I/O. Callers own the refetch: any mutation is
//! expected to be followed by a pagination reset and a new fetch.

use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;

use crate::model::PhoneModel;
use crate::model::format_number;
use crate::pagination::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RangeField {
    Ram,
    Battery,
    Price,
    ScreenSize,
    Storage,
}

impl RangeField {
    pub const ALL: [RangeField; 5] = [
        RangeField::Ram,
        RangeField::Battery,
        RangeField::Price,
        RangeField::ScreenSize,
        RangeField::Storage,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ram" => Some(Self::Ram),
            "battery" => Some(Self::Battery),
            "price" => Some(Self::Price),
            "screen_size" | "screensize" | "screen" => Some(Self::ScreenSize),
            "storage" => Some(Self::Storage),
            _ => None,
        }
    }

    /// Attribute name as used by the dataset service and the search index.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Ram => "ram",
            Self::Battery => "battery",
            Self::Price => "price",
            Self::ScreenSize => "screenSize",
            Self::Storage => "storage",
        }
    }

    fn param_suffix(self) -> &'static str {
        match self {
            Self::Ram => "Ram",
            Self::Battery => "Battery",
            Self::Price => "Price",
            Self::ScreenSize => "ScreenSize",
            Self::Storage => "Storage",
        }
    }

    pub fn value_of(self, phone: &PhoneModel) -> Option<f64> {
        match self {
            Self::Ram => phone.ram,
            Self::Battery => phone.battery,
            Self::Price => phone.price,
            Self::ScreenSize => phone.screen_size,
            Self::Storage => phone.storage,
        }
    }
}

/// Inclusive numeric bounds. Unset sides are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Range {
    min: Option<f64>,
    max: Option<f64>,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: sanitize(min),
            max: sanitize(max),
        }
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Bounds that are safe to send. An inverted pair is dropped entirely.
    pub fn effective(&self) -> (Option<f64>, Option<f64>) {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if lo > hi => (None, None),
            bounds => bounds,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self.effective(), (None, None))
    }

    pub fn contains(&self, value: Option<f64>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let (min, max) = self.effective();
        let Some(v) = value else {
            return false;
        };
        min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m)
    }
}

fn sanitize(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum SortField {
    #[default]
    Name,
    Brand,
    Price,
    Ram,
    Battery,
    ScreenSize,
    Weight,
    Year,
    Storage,
}

impl SortField {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Brand => "brand",
            Self::Price => "price",
            Self::Ram => "ram",
            Self::Battery => "battery",
            Self::ScreenSize => "screenSize",
            Self::Weight => "weight",
            Self::Year => "year",
            Self::Storage => "storage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Current user-chosen constraints. `Filter::default()` is the documented
/// reset state: nothing set, sorted by name ascending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    query: Option<String>,
    brands: Vec<String>,
    ram: Range,
    battery: Range,
    price: Range,
    screen_size: Range,
    storage: Range,
    years: Vec<u32>,
    processor: Option<String>,
    sort_by: SortField,
    sort_order: SortOrder,
}

impl Filter {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = non_blank(query);
    }

    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    pub fn add_brand(&mut self, brand: &str) {
        let Some(brand) = non_blank(brand) else {
            return;
        };
        if !self.brands.iter().any(|b| b.eq_ignore_ascii_case(&brand)) {
            self.brands.push(brand);
        }
    }

    pub fn range(&self, field: RangeField) -> Range {
        *self.range_slot(field)
    }

    pub fn set_range(&mut self, field: RangeField, min: Option<f64>, max: Option<f64>) {
        *self.range_slot_mut(field) = Range::new(min, max);
    }

    pub fn set_min(&mut self, field: RangeField, min: Option<f64>) {
        let max = self.range(field).max();
        self.set_range(field, min, max);
    }

    pub fn set_max(&mut self, field: RangeField, max: Option<f64>) {
        let min = self.range(field).min();
        self.set_range(field, min, max);
    }

    pub fn years(&self) -> &[u32] {
        &self.years
    }

    pub fn add_year(&mut self, year: u32) {
        if !self.years.contains(&year) {
            self.years.push(year);
        }
    }

    pub fn processor(&self) -> Option<&str> {
        self.processor.as_deref()
    }

    pub fn set_processor(&mut self, processor: &str) {
        self.processor = non_blank(processor);
    }

    pub fn sort(&self) -> (SortField, SortOrder) {
        (self.sort_by, self.sort_order)
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        self.sort_by = field;
        self.sort_order = order;
    }

    fn range_slot(&self, field: RangeField) -> &Range {
        match field {
            RangeField::Ram => &self.ram,
            RangeField::Battery => &self.battery,
            RangeField::Price => &self.price,
            RangeField::ScreenSize => &self.screen_size,
            RangeField::Storage => &self.storage,
        }
    }

    fn range_slot_mut(&mut self, field: RangeField) -> &mut Range {
        match field {
            RangeField::Ram => &mut self.ram,
            RangeField::Battery => &mut self.battery,
            RangeField::Price => &mut self.price,
            RangeField::ScreenSize => &mut self.screen_size,
            RangeField::Storage => &mut self.storage,
        }
    }

    /// Canonical request parameters: keys in ascending order, repeated keys
    /// in insertion order, unset fields omitted.
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::default();
        if let Some(query) = &self.query {
            params.push("search", query.clone());
        }
        for brand in &self.brands {
            params.push("brand", brand.clone());
        }
        for field in RangeField::ALL {
            let (min, max) = self.range(field).effective();
            if let Some(min) = min {
                params.push(&format!("min{}", field.param_suffix()), format_number(min));
            }
            if let Some(max) = max {
                params.push(&format!("max{}", field.param_suffix()), format_number(max));
            }
        }
        for year in &self.years {
            params.push("year", year.to_string());
        }
        if let Some(processor) = &self.processor {
            params.push("processor", processor.clone());
        }
        params.push("sortBy", self.sort_by.as_param().to_string());
        params.push("sortOrder", self.sort_order.as_param().to_string());
        params.canonical()
    }

    /// Client-side check of a returned row against the structured
    /// constraints. The free-text query is left to the server, whose
    /// matching rules are not reproducible here.
    pub fn matches(&self, phone: &PhoneModel) -> bool {
        if !self.brands.is_empty()
            && !self
                .brands
                .iter()
                .any(|b| b.eq_ignore_ascii_case(phone.brand.trim()))
        {
            return false;
        }
        if RangeField::ALL
            .iter()
            .any(|field| !self.range(*field).contains(field.value_of(phone)))
        {
            return false;
        }
        if !self.years.is_empty() && !phone.year.is_some_and(|y| self.years.contains(&y)) {
            return false;
        }
        if let Some(needle) = &self.processor {
            let needle = needle.to_lowercase();
            let hit = phone
                .processor
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
impl Filter {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn push(&mut self, key: &str, value: String) {
        self.0.push((key.to_string(), value));
    }

    fn canonical(mut self) -> Self {
        // stable: repeated keys keep insertion order
        self.0.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }

    pub fn with_page(&self, page: PageRequest) -> Self {
        let mut params = self.clone();
        params.push("limit", page.limit.to_string());
        params.push("offset", page.offset.to_string());
        params.canonical()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

}

#[cfg(test)]
impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
