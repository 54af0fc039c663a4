//! Hot-swappable file pointers for the "latest N days" endpoints.
//! HTTP readers resolve a slot to a path and then read the file; the swap
//! only replaces the pointer, so a reader that raced the swap still opens
//! a valid (one-generation-old) file. Old outputs are never deleted.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::NaiveDate;
use tracing::warn;

/// Swappable path capability. Handlers depend on this, not on the
/// concrete lock-guarded type.
pub trait Alias: Send + Sync {
    fn get_path(&self) -> PathBuf;
    fn set_path(&self, path: PathBuf);
}

/// The one concrete alias: a reader-shared/writer-exclusive pointer.
/// The lock is held only across the pointer copy or swap, never across
/// file I/O, so readers never block behind a slow request.
#[derive(Debug)]
pub struct AliasHandler {
    path: RwLock<PathBuf>,
}

impl AliasHandler {
    pub fn new(path: PathBuf) -> AliasHandler {
        AliasHandler {
            path: RwLock::new(path),
        }
    }
}

impl Alias for AliasHandler {
    fn get_path(&self) -> PathBuf {
        match self.path.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_path(&self, path: PathBuf) {
        match self.path.write() {
            Ok(mut guard) => *guard = path,
            Err(poisoned) => *poisoned.into_inner() = path,
        }
    }
}

/// Number of rolling day slots: today, -1day, -2day.
pub const SLOT_COUNT: usize = 3;

/// The published file pointers, one per rolling day slot.
pub struct AliasRegistry {
    slots: [AliasHandler; SLOT_COUNT],
}

impl AliasRegistry {
    /// All slots start on `seed` (the dataset's first day) so the routes
    /// resolve to something valid before the first cycle publishes.
    pub fn new(seed: PathBuf) -> AliasRegistry {
        AliasRegistry {
            slots: [
                AliasHandler::new(seed.clone()),
                AliasHandler::new(seed.clone()),
                AliasHandler::new(seed),
            ],
        }
    }

    pub fn slot(&self, index: usize) -> &AliasHandler {
        &self.slots[index]
    }

    /// Points the slots at the most recent converted outputs: dated
    /// `*.json` names in `converted_dir` sorted descending, most recent
    /// first. With fewer files than slots, trailing slots keep their
    /// previous targets. Failure to scan leaves everything untouched.
    pub fn rotate(&self, converted_dir: &Path) {
        let mut dated = match list_dated_outputs(converted_dir) {
            Ok(dated) => dated,
            Err(err) => {
                warn!(dir = %converted_dir.display(), error = %err, "alias rotation skipped");
                return;
            }
        };
        dated.sort_by(|a, b| b.0.cmp(&a.0));
        for (slot, (_date, path)) in self.slots.iter().zip(dated) {
            slot.set_path(path);
        }
    }
}

fn list_dated_outputs(dir: &Path) -> std::io::Result<Vec<(NaiveDate, PathBuf)>> {
    let mut dated = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
            dated.push((date, path));
        }
    }
    Ok(dated)
}
