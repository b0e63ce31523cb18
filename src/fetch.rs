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

//! Request lifecycle for dataset reads.
//!
//! Every trigger takes a [`Ticket`] carrying a monotonically increasing
//! generation. A completion whose generation is older than the latest issued
//! ticket is dropped, so a slow earlier response can never overwrite the
//! state produced by a newer request.

use std::mem;

use crate::backend::DatasetBackend;
use crate::error::FetchError;
use crate::error::FetchResult;
use crate::filter::Filter;
use crate::model::SearchResult;
use crate::pagination::PageRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> FetchState<T> {
    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

pub struct Fetcher {
    backend: Box<dyn DatasetBackend>,
    state: FetchState<SearchResult>,
    retained: Option<SearchResult>,
    issued: u64,
}

impl Fetcher {
    pub fn new(backend: Box<dyn DatasetBackend>) -> Self {
        Self {
            backend,
            state: FetchState::Idle,
            retained: None,
            issued: 0,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn state(&self) -> &FetchState<SearchResult> {
        &self.state
    }

    /// Most recent successful result, even while loading or after an error.
    /// Callers must treat it as stale whenever the state is not `Success`.
    pub fn last_result(&self) -> Option<&SearchResult> {
        match &self.state {
            FetchState::Success(result) => Some(result),
            _ => self.retained.as_ref(),
        }
    }

    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        self.transition(FetchState::Loading);
        Ticket {
            generation: self.issued,
        }
    }

    pub fn complete(&mut self, ticket: Ticket, outcome: FetchResult<SearchResult>) -> Completion {
        if ticket.generation() < self.issued {
            log::debug!(
                "dropping response for generation {} (latest {})",
                ticket.generation(),
                self.issued
            );
            return Completion::Stale;
        }
        match outcome {
            Ok(result) => {
                self.retained = None;
                self.state = FetchState::Success(result);
            }
            Err(err) => {
                log::warn!("{} fetch failed: {err}", self.backend.name());
                self.transition(FetchState::Error(err.user_message()));
            }
        }
        Completion::Applied
    }

    pub fn fetch(&mut self, filter: &Filter, page: PageRequest) -> &FetchState<SearchResult> {
        let ticket = self.begin();
        let outcome = self.backend.search(filter, page);
        self.complete(ticket, outcome);
        &self.state
    }

    /// Same lifecycle as [`Fetcher::fetch`], but hands the typed error back
    /// so one-shot commands can report its code.
    pub fn try_fetch(&mut self, filter: &Filter, page: PageRequest) -> FetchResult<&SearchResult> {
        let ticket = self.begin();
        let outcome = self.backend.search(filter, page);
        let failure = outcome.as_ref().err().cloned();
        self.complete(ticket, outcome);
        if let Some(err) = failure {
            return Err(err);
        }
        self.last_result()
            .ok_or_else(|| FetchError::Decode("no result was recorded".to_string()))
    }

    fn transition(&mut self, next: FetchState<SearchResult>) {
        if let FetchState::Success(previous) = mem::replace(&mut self.state, next) {
            self.retained = Some(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::model::PageMeta;
    use crate::model::PhoneModel;

    struct ScriptedBackend {
        responses: RefCell<VecDeque<FetchResult<SearchResult>>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<FetchResult<SearchResult>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
            }
        }
    }

    impl DatasetBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn search(&self, _filter: &Filter, _page: PageRequest) -> FetchResult<SearchResult> {
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Transport("exhausted".to_string())))
        }
    }

    fn result(names: &[&str]) -> SearchResult {
        SearchResult {
            items: names.iter().map(|n| PhoneModel::new("Apple", *n)).collect(),
            total: names.len(),
            filtered: names.len(),
            page: PageMeta {
                limit: 20,
                offset: 0,
                has_more: false,
            },
        }
    }

    fn page() -> PageRequest {
        PageRequest {
            limit: 20,
            offset: 0,
        }
    }

    fn idle_fetcher() -> Fetcher {
        Fetcher::new(Box::new(ScriptedBackend::new(Vec::new())))
    }

    #[test]
    fn starts_idle_and_moves_through_loading() {
        let mut fetcher = idle_fetcher();
        assert_eq!(fetcher.state(), &FetchState::Idle);
        let ticket = fetcher.begin();
        assert_eq!(fetcher.state(), &FetchState::Loading);
        fetcher.complete(ticket, Ok(result(&["iPhone 15"])));
        assert!(matches!(fetcher.state(), FetchState::Success(r) if r.items.len() == 1));
    }

    #[test]
    fn error_keeps_last_good_result() {
        let backend = ScriptedBackend::new(vec![
            Ok(result(&["iPhone 15"])),
            Err(FetchError::Transport("connection refused".to_string())),
        ]);
        let mut fetcher = Fetcher::new(Box::new(backend));
        fetcher.fetch(&Filter::default(), page());
        let state = fetcher.fetch(&Filter::default(), page());
        assert!(state.error().is_some_and(|m| m.contains("Could not reach")));
        let retained = fetcher.last_result().expect("retained");
        assert_eq!(retained.items[0].name, "iPhone 15");
    }

    #[test]
    fn stale_completion_is_dropped() {
        let mut fetcher = idle_fetcher();
        let first = fetcher.begin();
        let second = fetcher.begin();
        assert!(second.generation() > first.generation());

        assert_eq!(
            fetcher.complete(second, Ok(result(&["newer"]))),
            Completion::Applied
        );
        assert_eq!(
            fetcher.complete(first, Ok(result(&["older"]))),
            Completion::Stale
        );
        let current = fetcher.last_result().expect("result");
        assert_eq!(current.items[0].name, "newer");
    }

    #[test]
    fn stale_error_does_not_clobber_newer_success() {
        let mut fetcher = idle_fetcher();
        let first = fetcher.begin();
        let second = fetcher.begin();
        fetcher.complete(second, Ok(result(&["fresh"])));
        fetcher.complete(first, Err(FetchError::Decode("bad".to_string())));
        assert!(matches!(fetcher.state(), FetchState::Success(_)));
    }

    #[test]
    fn loading_retains_previous_success_without_reporting_it() {
        let mut fetcher = idle_fetcher();
        let ticket = fetcher.begin();
        fetcher.complete(ticket, Ok(result(&["a", "b"])));
        fetcher.begin();
        assert_eq!(fetcher.state(), &FetchState::Loading);
        assert_eq!(fetcher.last_result().map(|r| r.items.len()), Some(2));
    }

    #[test]
    fn success_replaces_results_wholesale() {
        let backend = ScriptedBackend::new(vec![Ok(result(&["a", "b", "c"])), Ok(result(&["d"]))]);
        let mut fetcher = Fetcher::new(Box::new(backend));
        fetcher.fetch(&Filter::default(), page());
        fetcher.fetch(&Filter::default(), page());
        let names: Vec<_> = fetcher
            .last_result()
            .unwrap()
            .items
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["d".to_string()]);
    }

    #[test]
    fn try_fetch_returns_typed_error_and_keeps_state() {
        let backend = ScriptedBackend::new(vec![
            Ok(result(&["a"])),
            Err(FetchError::Status {
                status: 500,
                body: "boom".to_string(),
            }),
        ]);
        let mut fetcher = Fetcher::new(Box::new(backend));
        assert_eq!(fetcher.try_fetch(&Filter::default(), page()).unwrap().items.len(), 1);
        let err = fetcher.try_fetch(&Filter::default(), page()).unwrap_err();
        assert_eq!(err.code(), "http_status");
        assert!(fetcher.state().error().is_some());
    }
}
