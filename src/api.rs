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

//! Client for the dataset service's auxiliary endpoints: similar phones,
//! phones near a price point, and the prediction models.

use std::fmt;

use clap::ValueEnum;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::config::Config;
use crate::error::FetchError;
use crate::error::FetchResult;
use crate::http;
use crate::model::PhoneModel;
use crate::model::PriceRange;
use crate::model::PriceSearchResult;
use crate::model::SimilarModel;
use crate::model::format_price;

pub const SIMILAR_PATH: &str = "/api/models/similar";
pub const BY_PRICE_PATH: &str = "/api/models/by-price";
pub const PREDICT_PATH: &str = "/predict";

/// Representative feature values sent to similarity and prediction models.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_camera: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_camera: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
}

impl Features {
    pub fn from_phone(phone: &PhoneModel) -> Self {
        Self {
            brand: Some(phone.brand.clone()),
            ram: phone.ram,
            battery: phone.battery,
            screen_size: phone.screen_size,
            weight: phone.weight,
            year: phone.year,
            price: phone.price,
            storage: phone.storage,
            front_camera: phone.front_camera,
            back_camera: phone.back_camera,
            processor: phone.processor.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A price point with a relative tolerance, e.g. 500 ± 20%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuery {
    price: f64,
    tolerance: f64,
}

impl PriceQuery {
    pub const DEFAULT_TOLERANCE: f64 = 0.2;

    pub fn new(price: f64, tolerance: f64) -> FetchResult<Self> {
        if !price.is_finite() || price <= 0.0 {
            return Err(FetchError::InvalidRequest(
                "price must be a positive number".to_string(),
            ));
        }
        if !tolerance.is_finite() || !(0.0..=1.0).contains(&tolerance) {
            return Err(FetchError::InvalidRequest(
                "tolerance must be between 0 and 1".to_string(),
            ));
        }
        Ok(Self { price, tolerance })
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn range(&self) -> PriceRange {
        PriceRange {
            min: self.price * (1.0 - self.tolerance),
            max: self.price * (1.0 + self.tolerance),
        }
    }
}

impl PriceSearchResult {
    /// User-facing notice for an empty match, naming both boundaries.
    pub fn empty_message(&self) -> Option<String> {
        (self.total == 0).then(|| {
            format!(
                "No phones found between {} and {}",
                format_price(self.requested.min),
                format_price(self.requested.max)
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PredictTarget {
    Price,
    Brand,
    Ram,
    Battery,
}

impl PredictTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            PredictTarget::Price => "price",
            PredictTarget::Brand => "brand",
            PredictTarget::Ram => "ram",
            PredictTarget::Battery => "battery",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Number(f64),
    Label(String),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Number(n) => write!(f, "{n:.2}"),
            Prediction::Label(s) => f.write_str(s),
        }
    }
}

#[derive(Serialize)]
struct SimilarRequest<'a> {
    #[serde(flatten)]
    features: &'a Features,
    limit: usize,
}

#[derive(Deserialize)]
struct SimilarResponse {
    models: Vec<SimilarModel>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceRequest {
    price: f64,
    tolerance: f64,
    min_price: f64,
    max_price: f64,
    limit: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceResponse {
    models: Vec<PhoneModel>,
    total_count: usize,
    #[serde(default)]
    price_range: Option<PriceRange>,
    #[serde(default)]
    brands: Vec<String>,
}

pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> FetchResult<Self> {
        Ok(Self {
            client: http::build_client(config)?,
            base: config.api_base().to_string(),
        })
    }

    pub fn similar(&self, features: &Features, limit: usize) -> FetchResult<Vec<SimilarModel>> {
        if features.is_empty() {
            return Err(FetchError::InvalidRequest(
                "at least one feature is required".to_string(),
            ));
        }
        let url = format!("{}{}", self.base, SIMILAR_PATH);
        log::debug!("POST {url}");
        let resp: SimilarResponse = http::send_json(
            self.client
                .post(&url)
                .json(&SimilarRequest { features, limit }),
        )?;
        Ok(resp.models)
    }

    pub fn by_price(&self, query: PriceQuery, limit: usize) -> FetchResult<PriceSearchResult> {
        let requested = query.range();
        let url = format!("{}{}", self.base, BY_PRICE_PATH);
        log::debug!("POST {url} range={:.2}..{:.2}", requested.min, requested.max);
        let resp: PriceResponse = http::send_json(self.client.post(&url).json(&PriceRequest {
            price: query.price(),
            tolerance: query.tolerance(),
            min_price: requested.min,
            max_price: requested.max,
            limit,
        }))?;
        Ok(PriceSearchResult {
            items: resp.models,
            total: resp.total_count,
            requested,
            observed: resp.price_range,
            brands: resp.brands,
        })
    }

    pub fn predict(&self, target: PredictTarget, features: &Features) -> FetchResult<Prediction> {
        if features.is_empty() {
            return Err(FetchError::InvalidRequest(
                "at least one feature is required".to_string(),
            ));
        }
        let url = format!("{}{}/{}", self.base, PREDICT_PATH, target.as_str());
        log::debug!("POST {url}");
        let body: Map<String, Value> = http::send_json(self.client.post(&url).json(features))?;
        decode_prediction(target, &body)
    }
}

fn decode_prediction(target: PredictTarget, body: &Map<String, Value>) -> FetchResult<Prediction> {
    let value = body
        .get(target.as_str())
        .or_else(|| body.get("prediction"))
        .or_else(|| {
            if body.len() == 1 {
                body.values().next()
            } else {
                None
            }
        });
    match value {
        Some(Value::Number(n)) => n.as_f64().map(Prediction::Number).ok_or_else(|| {
            FetchError::Decode(format!("{} prediction is out of range", target.as_str()))
        }),
        Some(Value::String(s)) => Ok(Prediction::Label(s.clone())),
        _ => Err(FetchError::Decode(format!(
            "response has no {} prediction",
            target.as_str()
        ))),
    }
}
