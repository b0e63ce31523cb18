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

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::backend::DatasetBackend;
use crate::config::Config;
use crate::error::FetchResult;
use crate::filter::Filter;
use crate::http;
use crate::model::PageMeta;
use crate::model::PhoneModel;
use crate::model::SearchResult;
use crate::pagination::PageRequest;

pub const COLLECTION_PATH: &str = "/api/models";

/// Reads the dataset service's collection endpoint directly.
pub struct RestBackend {
    client: Client,
    url: String,
}

impl RestBackend {
    pub fn new(config: &Config) -> FetchResult<Self> {
        Ok(Self {
            client: http::build_client(config)?,
            url: format!("{}{}", config.api_base(), COLLECTION_PATH),
        })
    }
}

impl DatasetBackend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn search(&self, filter: &Filter, page: PageRequest) -> FetchResult<SearchResult> {
        let params = filter.to_params().with_page(page);
        log::debug!("GET {}?{}", self.url, params);
        let body: CollectionResponse =
            http::send_json(self.client.get(&self.url).query(params.pairs()))?;
        Ok(body.into_result(page))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePagination {
    limit: usize,
    offset: usize,
    has_more: bool,
}

/// The collection endpoint answers in one of two shapes depending on the
/// service version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CollectionResponse {
    Models {
        models: Vec<PhoneModel>,
        #[serde(rename = "totalCount")]
        total_count: usize,
        #[serde(rename = "filteredCount", default)]
        filtered_count: Option<usize>,
        #[serde(default)]
        pagination: Option<WirePagination>,
    },
    Items {
        #[serde(alias = "products")]
        items: Vec<PhoneModel>,
        total: usize,
    },
}

impl CollectionResponse {
    fn into_result(self, page: PageRequest) -> SearchResult {
        match self {
            CollectionResponse::Models {
                models,
                total_count,
                filtered_count,
                pagination,
            } => {
                let filtered = filtered_count.unwrap_or(total_count);
                let page = match pagination {
                    Some(p) => PageMeta {
                        limit: p.limit,
                        offset: p.offset,
                        has_more: p.has_more,
                    },
                    None => derived_page(page, models.len(), filtered),
                };
                SearchResult {
                    items: models,
                    total: total_count,
                    filtered,
                    page,
                }
            }
            CollectionResponse::Items { items, total } => {
                let page = derived_page(page, items.len(), total);
                SearchResult {
                    items,
                    total,
                    filtered: total,
                    page,
                }
            }
        }
    }
}

fn derived_page(page: PageRequest, returned: usize, filtered: usize) -> PageMeta {
    PageMeta {
        limit: page.limit,
        offset: page.offset,
        has_more: page.offset.saturating_add(returned) < filtered,
    }
}
