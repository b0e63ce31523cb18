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

//! Bounded comparison selection shared across invocations.
//!
//! The JSON file on disk is the single source of truth. [`ComparisonStore`]
//! keeps an in-memory copy as a cache and refreshes it from the file under an
//! exclusive lock before every mutation.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;
use fs2::FileExt;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use tempfile::NamedTempFile;

use crate::model::ItemKey;

pub const DEFAULT_CAP: usize = 5;

const LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Added,
    Duplicate,
    Full,
}

/// Ordered, unique, capped list of phones picked for side-by-side viewing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonSet {
    items: Vec<ItemKey>,
    cap: usize,
}

impl Default for ComparisonSet {
    fn default() -> Self {
        Self::new(DEFAULT_CAP)
    }
}

impl ComparisonSet {
    pub fn new(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            cap: cap.max(1),
        }
    }

    pub fn add(&mut self, key: ItemKey) -> AddOutcome {
        if self.contains(&key) {
            return AddOutcome::Duplicate;
        }
        if self.is_full() {
            return AddOutcome::Full;
        }
        self.items.push(key);
        AddOutcome::Added
    }

    pub fn remove(&mut self, index: usize) -> Option<ItemKey> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, key: &ItemKey) -> bool {
        self.items.iter().any(|k| {
            k.brand.eq_ignore_ascii_case(&key.brand) && k.name.eq_ignore_ascii_case(&key.name)
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.cap
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn keys(&self) -> &[ItemKey] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemKey> {
        self.items.iter()
    }
}

type Subscriber = Box<dyn Fn(&ComparisonSet)>;

/// Process-wide owner of the comparison selection. Open once at startup.
pub struct ComparisonStore {
    path: PathBuf,
    cache: ComparisonSet,
    subscribers: Vec<Subscriber>,
}

impl ComparisonStore {
    pub fn open(path: &Path, cap: usize) -> Result<Self> {
        let cache = {
            let _lock = acquire_lock(path)?;
            read_set(path, cap)?
        };
        Ok(Self {
            path: path.to_path_buf(),
            cache,
            subscribers: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> &ComparisonSet {
        &self.cache
    }

    pub fn subscribe(&mut self, subscriber: impl Fn(&ComparisonSet) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn reload(&mut self) -> Result<&ComparisonSet> {
        let _lock = acquire_lock(&self.path)?;
        self.cache = read_set(&self.path, self.cache.cap())?;
        Ok(&self.cache)
    }

    /// Applies `f` to the current on-disk selection and writes it back.
    /// Subscribers run only when the selection actually changed.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut ComparisonSet) -> R) -> Result<R> {
        let _lock = acquire_lock(&self.path)?;
        let mut set = read_set(&self.path, self.cache.cap())?;
        let before = set.clone();
        let out = f(&mut set);
        let changed = set != before;
        if changed {
            write_set(&self.path, &set)?;
        }
        self.cache = set;
        if changed {
            for subscriber in &self.subscribers {
                subscriber(&self.cache);
            }
        }
        Ok(out)
    }

    pub fn set(&mut self, keys: Vec<ItemKey>) -> Result<()> {
        self.update(|set| {
            set.clear();
            for key in keys {
                set.add(key);
            }
        })
    }
}

fn read_set(path: &Path, cap: usize) -> Result<ComparisonSet> {
    let mut set = ComparisonSet::new(cap);
    if !path.exists() {
        return Ok(set);
    }
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(set);
    }
    let keys: Vec<ItemKey> = match serde_json::from_str(&text) {
        Ok(keys) => keys,
        Err(err) => {
            log::warn!(
                "ignoring unreadable comparison file {}: {err}",
                path.display()
            );
            return Ok(set);
        }
    };
    let stored = keys.len();
    for key in keys {
        set.add(key);
    }
    if set.len() < stored {
        log::warn!(
            "comparison file {} held {stored} entries; kept {}",
            path.display(),
            set.len()
        );
    }
    Ok(set)
}

fn write_set(path: &Path, set: &ComparisonSet) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, set.keys())?;
    writeln!(tmp)?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

struct ComparisonLock {
    _file: File,
}

/// Lock file for `path`, keyed by the canonical parent directory so every
/// spelling of the same comparison file shares one lock.
fn lock_path_for(path: &Path) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("create comparison dir {}", parent.display()))?;
    let name = path
        .file_name()
        .with_context(|| format!("comparison path has no file name: {}", path.display()))?;
    let canonical = parent
        .canonicalize()
        .with_context(|| format!("resolve {}", parent.display()))?
        .join(name);
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash = hex::encode(hasher.finalize());
    let mut dir = std::env::temp_dir();
    dir.push("phonedex");
    fs::create_dir_all(&dir).with_context(|| format!("create lock dir {}", dir.display()))?;
    Ok(dir.join(format!("comparison-{hash}.lock")))
}

fn acquire_lock(path: &Path) -> Result<ComparisonLock> {
    let lock_path = lock_path_for(path)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("open lock file {}", lock_path.display()))?;
    let deadline = Instant::now() + LOCK_TIMEOUT;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(ComparisonLock { _file: file }),
            Err(_) if Instant::now() >= deadline => {
                anyhow::bail!(
                    "comparison list is locked; another process may be using {}",
                    path.display()
                );
            }
            Err(_) => sleep(Duration::from_millis(50)),
        }
    }
}
