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

//! Blocking HTTP plumbing shared by the dataset backends and the API client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::FetchError;
use crate::error::FetchResult;

const MAX_ERROR_BODY: usize = 200;

pub fn build_client(config: &Config) -> FetchResult<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Sends the request and decodes a JSON body. Non-2xx statuses become
/// [`FetchError::Status`] carrying a truncated body.
pub fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> FetchResult<T> {
    let response = request.send()?;
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
