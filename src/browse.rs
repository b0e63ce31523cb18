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

//! Line-oriented browsing session over stdin.

use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;

use crate::compare::AddOutcome;
use crate::compare::ComparisonStore;
use crate::export;
use crate::fetch::FetchState;
use crate::fetch::Fetcher;
use crate::filter::Filter;
use crate::filter_expr;
use crate::model::PhoneModel;
use crate::model::SearchResult;
use crate::model::format_number;
use crate::model::format_price;
use crate::pagination::Pagination;
use crate::pagination::render_window;

const HELP: &str = "\
commands:
  n              next page
  p              previous page
  f <expr>       refine the filter, e.g. f brand = 'Apple' AND ram >= 8
  r              reset all filters
  c <n>          add row n of this page to the comparison
  s              show the comparison
  e [file]       export this page to CSV
  h              help
  q              quit";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Next,
    Prev,
    Refine(String),
    Reset,
    Compare(usize),
    Show,
    Export(Option<PathBuf>),
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        match head {
            "n" | "next" => Ok(Self::Next),
            "p" | "prev" => Ok(Self::Prev),
            "f" | "filter" if !rest.is_empty() => Ok(Self::Refine(rest.to_string())),
            "f" | "filter" => Err("usage: f <expr>".to_string()),
            "r" | "reset" => Ok(Self::Reset),
            "c" | "compare" => rest
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Self::Compare)
                .ok_or_else(|| "usage: c <row number>".to_string()),
            "s" | "show" => Ok(Self::Show),
            "e" | "export" if rest.is_empty() => Ok(Self::Export(None)),
            "e" | "export" => Ok(Self::Export(Some(PathBuf::from(rest)))),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command `{other}`; type h for help")),
        }
    }
}

pub struct Browser<'a> {
    fetcher: Fetcher,
    filter: Filter,
    pagination: Pagination,
    store: &'a mut ComparisonStore,
}

impl<'a> Browser<'a> {
    pub fn new(
        fetcher: Fetcher,
        filter: Filter,
        limit: usize,
        store: &'a mut ComparisonStore,
    ) -> Self {
        Self {
            fetcher,
            filter,
            pagination: Pagination::new(limit),
            store,
        }
    }

    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> Result<()> {
        self.refresh(out)?;
        prompt(out)?;
        for line in input.lines() {
            let line = line.context("read command")?;
            if line.trim().is_empty() {
                prompt(out)?;
                continue;
            }
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command, out)?,
                Err(msg) => writeln!(out, "{msg}")?,
            }
            prompt(out)?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn execute(&mut self, command: Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Next => {
                let before = self.pagination.clone();
                if !self.pagination.next() {
                    writeln!(out, "already on the last page")?;
                } else if !self.refresh(out)? {
                    self.pagination = before;
                }
            }
            Command::Prev => {
                let before = self.pagination.clone();
                if !self.pagination.prev() {
                    writeln!(out, "already on the first page")?;
                } else if !self.refresh(out)? {
                    self.pagination = before;
                }
            }
            Command::Refine(expr) => {
                let mut next = self.filter.clone();
                match filter_expr::apply_str(&expr, &mut next) {
                    Ok(()) => {
                        self.filter = next;
                        self.pagination.reset();
                        self.refresh(out)?;
                    }
                    Err(err) => writeln!(out, "error: {err:#}")?,
                }
            }
            Command::Reset => {
                self.filter.reset();
                self.pagination.reset();
                self.refresh(out)?;
            }
            Command::Compare(row) => self.compare(row, out)?,
            Command::Show => {
                let set = self.store.reload()?;
                if set.is_empty() {
                    writeln!(out, "comparison is empty")?;
                }
                for (i, key) in set.iter().enumerate() {
                    writeln!(out, "{:>3}  {key}", i + 1)?;
                }
            }
            Command::Export(path) => self.export(path, out)?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => {}
        }
        Ok(())
    }

    /// Fetches the current page. Returns whether the fetch succeeded.
    fn refresh(&mut self, out: &mut impl Write) -> Result<bool> {
        match self.fetcher.fetch(&self.filter, self.pagination.request()) {
            FetchState::Success(result) => {
                self.pagination.update(result);
                write_page(out, result, &self.pagination)?;
                let stray = count_mismatches(&self.filter, result);
                if stray > 0 {
                    writeln!(out, "note: {stray} rows do not match the current filter")?;
                }
                Ok(true)
            }
            state => {
                if let Some(msg) = state.error() {
                    writeln!(out, "error: {msg}")?;
                }
                Ok(false)
            }
        }
    }

    /// Rows of the page on screen. `None` once a fetch has failed, since the
    /// retained rows belong to an earlier filter or page.
    fn current_items(&self) -> Option<&[PhoneModel]> {
        match self.fetcher.state() {
            FetchState::Success(result) => Some(&result.items),
            _ => None,
        }
    }

    fn compare(&mut self, row: usize, out: &mut impl Write) -> Result<()> {
        let Some(items) = self.current_items() else {
            writeln!(out, "last fetch failed; nothing to compare")?;
            return Ok(());
        };
        let Some(key) = items.get(row - 1).map(PhoneModel::key) else {
            writeln!(out, "no row {row} on this page")?;
            return Ok(());
        };
        let outcome = self.store.update(|set| set.add(key.clone()))?;
        let set = self.store.get();
        match outcome {
            AddOutcome::Added => writeln!(out, "added {key} ({}/{})", set.len(), set.cap())?,
            AddOutcome::Duplicate => writeln!(out, "{key} is already in the comparison")?,
            AddOutcome::Full => writeln!(
                out,
                "comparison is full ({} phones); remove one first",
                set.cap()
            )?,
        }
        Ok(())
    }

    fn export(&self, path: Option<PathBuf>, out: &mut impl Write) -> Result<()> {
        let Some(items) = self.current_items() else {
            writeln!(out, "last fetch failed; nothing to export")?;
            return Ok(());
        };
        if items.is_empty() {
            writeln!(out, "nothing to export")?;
            return Ok(());
        }
        let path = path.unwrap_or_else(|| {
            PathBuf::from(export::default_export_name(
                time::OffsetDateTime::now_utc().date(),
            ))
        });
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let stats = export::export_csv(items, file)?;
        writeln!(out, "wrote {} rows to {}", stats.rows, path.display())?;
        Ok(())
    }
}

/// Rows the server returned that fail the client-side filter check.
pub fn count_mismatches(filter: &Filter, result: &SearchResult) -> usize {
    let stray = result.items.iter().filter(|p| !filter.matches(p)).count();
    if stray > 0 {
        log::warn!("{stray} of {} rows do not match the filter", result.items.len());
    }
    stray
}

fn prompt(out: &mut impl Write) -> io::Result<()> {
    write!(out, "> ")?;
    out.flush()
}

/// Summary line, one row per phone, and a page footer when there is more
/// than one page.
pub fn write_page(
    out: &mut impl Write,
    result: &SearchResult,
    pagination: &Pagination,
) -> io::Result<()> {
    writeln!(out, "{}", result.summary())?;
    for (i, phone) in result.items.iter().enumerate() {
        writeln!(out, "{}", format_row(i + 1, phone))?;
    }
    if pagination.total_pages() > 1 {
        writeln!(
            out,
            "page {} of {}  {}",
            pagination.current_page(),
            pagination.total_pages(),
            render_window(&pagination.window(), pagination.current_page())
        )?;
    }
    Ok(())
}

pub fn format_row(row: usize, phone: &PhoneModel) -> String {
    let cell = |value: Option<f64>, unit: &str| {
        value
            .map(|v| format!("{}{unit}", format_number(v)))
            .unwrap_or_else(|| "-".to_string())
    };
    format!(
        "{row:>3}  {} {}\t{}\t{}\t{}\t{}\t{}\t{}",
        phone.brand,
        phone.name,
        phone.price.map(format_price).unwrap_or_else(|| "-".to_string()),
        cell(phone.ram, " GB"),
        cell(phone.storage, " GB"),
        cell(phone.battery, " mAh"),
        cell(phone.screen_size, "\""),
        phone
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string()),
    )
}
