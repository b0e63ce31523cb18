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

//! Dataset backends. Exactly one is selected from configuration at
//! startup; there is no fallback between them at runtime.

pub mod index;
pub mod rest;

use anyhow::Result;

use crate::config::BackendKind;
use crate::config::Config;
use crate::error::FetchResult;
use crate::filter::Filter;
use crate::model::SearchResult;
use crate::pagination::PageRequest;

pub use index::IndexBackend;
pub use rest::RestBackend;

pub trait DatasetBackend {
    fn name(&self) -> &'static str;

    /// Reads one page of phones matching `filter`.
    fn search(&self, filter: &Filter, page: PageRequest) -> FetchResult<SearchResult>;
}

pub fn from_config(config: &Config) -> Result<Box<dyn DatasetBackend>> {
    let backend: Box<dyn DatasetBackend> = match config.backend {
        BackendKind::Rest => Box::new(RestBackend::new(config)?),
        BackendKind::Index => {
            if !config.index.is_configured() {
                anyhow::bail!(
                    "backend = \"index\" requires index.app_id, index.api_key and index.index_name"
                );
            }
            Box::new(IndexBackend::new(config)?)
        }
    };
    log::debug!("using {} dataset backend", backend.name());
    Ok(backend)
}
