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

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::filter::QueryParams;
use crate::model::ItemKey;
use crate::model::PriceRange;
use crate::model::PriceSearchResult;
use crate::model::SearchResult;
use crate::pagination::Pagination;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsOut {
    pub shown: usize,
    pub filtered: usize,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl StatsOut {
    pub fn from_result(result: &SearchResult, pagination: &Pagination) -> Self {
        Self {
            shown: result.items.len(),
            filtered: result.filtered,
            total: result.total,
            page: pagination.current_page(),
            total_pages: pagination.total_pages(),
            has_more: pagination.has_more(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOut {
    pub backend: String,
    pub params: QueryParams,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceOut {
    pub requested: PriceRange,
    pub observed: Option<PriceRange>,
    pub brands: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorOut {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct JsonResponse {
    pub ok: bool,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<QueryParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Vec<ItemKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOut>,
}

impl JsonResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            schema_version: "1".to_string(),
            ..Default::default()
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            ok: false,
            schema_version: "1".to_string(),
            error: Some(ErrorOut {
                code: code.to_string(),
                message: message.to_string(),
            }),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, backend: &str, params: QueryParams, pagination: &Pagination) -> Self {
        self.query = Some(QueryOut {
            backend: backend.to_string(),
            params,
            limit: pagination.limit(),
            offset: pagination.offset(),
        });
        self
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_results<T: Serialize>(mut self, results: &[T]) -> Result<Self> {
        let values = results
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.results = Some(values);
        Ok(self)
    }

    pub fn with_stats(mut self, stats: StatsOut) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_price_range(mut self, result: &PriceSearchResult) -> Self {
        self.price_range = Some(PriceOut {
            requested: result.requested,
            observed: result.observed,
            brands: result.brands.clone(),
        });
        self
    }

    pub fn with_comparison(mut self, keys: &[ItemKey]) -> Self {
        self.comparison = Some(keys.to_vec());
        self
    }

    pub fn with_prediction(mut self, prediction: Value) -> Self {
        self.prediction = Some(prediction);
        self
    }

    pub fn with_export(mut self, export: Value) -> Self {
        self.export = Some(export);
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_next_offset(mut self, pagination: &Pagination) -> Self {
        self.next_offset = pagination
            .has_more()
            .then(|| pagination.offset().saturating_add(pagination.limit()));
        self
    }
}

pub fn print_json(resp: &JsonResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(resp)?;
    println!("{text}");
    Ok(())
}
