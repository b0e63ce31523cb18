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

use serde::Serialize;

use crate::model::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

/// Offset/limit cursor over the filtered result set of the last fetch.
///
/// `limit` is fixed for the lifetime of the controller. Any filter change
/// must call [`Pagination::reset`]; page position is never carried across
/// filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    offset: usize,
    limit: usize,
    total: usize,
}

impl Pagination {
    pub fn new(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: limit.max(1),
            total: 0,
        }
    }

    /// Starts at the given 1-based page. Page 0 is treated as page 1; an
    /// offset past `usize::MAX` saturates.
    pub fn at_page(limit: usize, page: usize) -> Self {
        let mut pagination = Self::new(limit);
        pagination.offset = page.saturating_sub(1).saturating_mul(pagination.limit);
        pagination
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn request(&self) -> PageRequest {
        PageRequest {
            limit: self.limit,
            offset: self.offset,
        }
    }

    pub fn update(&mut self, result: &SearchResult) {
        self.total = result.filtered;
    }

    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.limit) < self.total
    }

    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.limit)
    }

    pub fn current_page(&self) -> usize {
        (self.offset / self.limit).saturating_add(1)
    }

    pub fn next(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }
        self.offset += self.limit;
        true
    }

    pub fn prev(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.offset = self.offset.saturating_sub(self.limit);
        true
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Condensed page list for display; `None` marks a gap.
    pub fn window(&self) -> Vec<Option<usize>> {
        page_window(self.total_pages(), self.current_page(), 2, 2, 4, 2)
    }
}

pub fn page_window(
    total_pages: usize,
    current_page: usize,
    left_edge: usize,
    left_current: usize,
    right_current: usize,
    right_edge: usize,
) -> Vec<Option<usize>> {
    let last_page = total_pages;

    if last_page == 0 {
        return vec![];
    }

    let current_page = current_page.min(last_page);
    let mut pages = Vec::new();

    let left_end = left_edge.saturating_add(1).min(last_page.saturating_add(1));
    pages.extend((1..left_end).map(Some));

    let mid_start = left_end.max(current_page.saturating_sub(left_current));
    let mid_end = current_page
        .saturating_add(right_current)
        .saturating_add(1)
        .min(last_page.saturating_add(1));

    if mid_start > left_end {
        pages.push(None);
    }
    pages.extend((mid_start..mid_end).map(Some));

    let right_start = mid_end.max(last_page.saturating_sub(right_edge).saturating_add(1));

    if right_start > mid_end {
        pages.push(None);
    }
    pages.extend((right_start..=last_page).map(Some));

    pages
}

pub fn render_window(pages: &[Option<usize>], current: usize) -> String {
    pages
        .iter()
        .map(|page| match page {
            Some(p) if *p == current => format!("[{p}]"),
            Some(p) => p.to_string(),
            None => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
