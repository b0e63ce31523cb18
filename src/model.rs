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

//! Shared domain types used across fetching, comparison, and export.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// One dataset record describing a phone's specifications.
///
/// Only `name` and `brand` are guaranteed by every source; everything else
/// is optional and rendered as blank when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneModel {
    #[serde(alias = "model", alias = "modelName")]
    pub name: String,
    #[serde(alias = "company")]
    pub brand: String,
    pub price: Option<f64>,
    pub ram: Option<f64>,
    pub battery: Option<f64>,
    pub screen_size: Option<f64>,
    pub weight: Option<f64>,
    pub year: Option<u32>,
    pub storage: Option<f64>,
    pub front_camera: Option<f64>,
    pub back_camera: Option<f64>,
    pub processor: Option<String>,
    pub display_type: Option<String>,
    pub image_url: Option<String>,
}

#[cfg(test)]
impl PhoneModel {
    pub fn new(brand: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            brand: brand.into(),
            price: None,
            ram: None,
            battery: None,
            screen_size: None,
            weight: None,
            year: None,
            storage: None,
            front_camera: None,
            back_camera: None,
            processor: None,
            display_type: None,
            image_url: None,
        }
    }
}

impl PhoneModel {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.brand, &self.name)
    }
}

/// Composite identity of a phone. No numeric id is stable across sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub brand: String,
    pub name: String,
}

impl ItemKey {
    pub fn new(brand: &str, name: &str) -> Self {
        Self {
            brand: brand.trim().to_string(),
            name: name.trim().to_string(),
        }
    }

    pub fn matches(&self, phone: &PhoneModel) -> bool {
        self.brand.eq_ignore_ascii_case(phone.brand.trim())
            && self.name.eq_ignore_ascii_case(phone.name.trim())
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.brand, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// One page of matches. Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub items: Vec<PhoneModel>,
    pub total: usize,
    pub filtered: usize,
    pub page: PageMeta,
}

impl SearchResult {
    pub fn summary(&self) -> String {
        format!("{} of {} phones found", self.items.len(), self.filtered)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarModel {
    pub model: PhoneModel,
    pub similarity_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSearchResult {
    pub items: Vec<PhoneModel>,
    pub total: usize,
    pub requested: PriceRange,
    pub observed: Option<PriceRange>,
    pub brands: Vec<String>,
}

pub fn format_price(value: f64) -> String {
    format!("${value:.2}")
}

/// Renders whole numbers without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
