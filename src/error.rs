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

use thiserror::Error;

/// Failures of a single request against the dataset, index, or prediction
/// service. Empty results are not errors.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "http_status",
            FetchError::Decode(_) => "decode",
            FetchError::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Message suitable for an inline banner.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Transport(_) => {
                "Could not reach the phone dataset service. Please try again later.".to_string()
            }
            FetchError::Status { status, .. } => {
                format!("The phone dataset service returned an error (HTTP {status}).")
            }
            FetchError::Decode(_) => "Received an unexpected response from the server.".to_string(),
            FetchError::InvalidRequest(msg) => msg.clone(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
