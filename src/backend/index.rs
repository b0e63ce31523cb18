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

//! Hosted search-index backend speaking the Algolia query protocol.
//!
//! Brand and year sets become `OR` groups, numeric ranges become inclusive
//! comparisons, and the processor substring joins the full-text query since
//! the index cannot express substring matches on attributes. Result order is
//! whatever ranking the index is configured with.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;

use crate::backend::DatasetBackend;
use crate::config::Config;
use crate::error::FetchResult;
use crate::filter::Filter;
use crate::filter::RangeField;
use crate::http;
use crate::model::PageMeta;
use crate::model::PhoneModel;
use crate::model::SearchResult;
use crate::model::format_number;
use crate::pagination::PageRequest;

pub struct IndexBackend {
    client: Client,
    url: String,
    app_id: String,
    api_key: String,
}

impl IndexBackend {
    pub fn new(config: &Config) -> FetchResult<Self> {
        Ok(Self {
            client: http::build_client(config)?,
            url: format!(
                "{}/1/indexes/{}/query",
                config.index.host(),
                config.index.index_name
            ),
            app_id: config.index.app_id.clone(),
            api_key: config.index.api_key.clone(),
        })
    }
}

impl DatasetBackend for IndexBackend {
    fn name(&self) -> &'static str {
        "index"
    }

    fn search(&self, filter: &Filter, page: PageRequest) -> FetchResult<SearchResult> {
        if filter.sort() != Filter::default().sort() {
            log::debug!("index backend ignores explicit sort; ranking comes from the index");
        }
        let body = IndexQuery::build(filter, page);
        log::debug!("POST {} filters={:?}", self.url, body.filters);
        let resp: IndexResponse = http::send_json(
            self.client
                .post(&self.url)
                .header("X-Algolia-Application-Id", &self.app_id)
                .header("X-Algolia-API-Key", &self.api_key)
                .json(&body),
        )?;
        Ok(resp.into_result())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexQuery {
    query: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    filters: String,
    hits_per_page: usize,
    page: usize,
}

impl IndexQuery {
    fn build(filter: &Filter, page: PageRequest) -> Self {
        let limit = page.limit.max(1);
        Self {
            query: query_text(filter),
            filters: filter_string(filter),
            hits_per_page: limit,
            page: page.offset / limit,
        }
    }
}

fn query_text(filter: &Filter) -> String {
    [filter.query(), filter.processor()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

fn filter_string(filter: &Filter) -> String {
    let mut clauses = Vec::new();

    let brands: Vec<String> = filter
        .brands()
        .iter()
        .map(|b| format!("brand:\"{}\"", b.replace('"', "\\\"")))
        .collect();
    if let Some(group) = or_group(brands) {
        clauses.push(group);
    }

    for field in RangeField::ALL {
        let (min, max) = filter.range(field).effective();
        if let Some(min) = min {
            clauses.push(format!("{} >= {}", field.attribute(), format_number(min)));
        }
        if let Some(max) = max {
            clauses.push(format!("{} <= {}", field.attribute(), format_number(max)));
        }
    }

    let years: Vec<String> = filter.years().iter().map(|y| format!("year = {y}")).collect();
    if let Some(group) = or_group(years) {
        clauses.push(group);
    }

    clauses.join(" AND ")
}

fn or_group(terms: Vec<String>) -> Option<String> {
    match terms.len() {
        0 => None,
        1 => terms.into_iter().next(),
        _ => Some(format!("({})", terms.join(" OR "))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexResponse {
    hits: Vec<PhoneModel>,
    nb_hits: usize,
    page: usize,
    nb_pages: usize,
    hits_per_page: usize,
}

impl IndexResponse {
    fn into_result(self) -> SearchResult {
        SearchResult {
            total: self.nb_hits,
            filtered: self.nb_hits,
            page: PageMeta {
                limit: self.hits_per_page,
                offset: self.page.saturating_mul(self.hits_per_page),
                has_more: self.page.saturating_add(1) < self.nb_pages,
            },
            items: self.hits,
        }
    }
}
