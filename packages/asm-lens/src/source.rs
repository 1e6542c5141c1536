use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::model::SourceWindow;

type Lines = Option<Arc<Vec<String>>>;

/// Source files split into lines, loaded on first use and kept for the rest
/// of the run. Files are assumed not to change while the tool runs.
///
/// Safe to share between matcher workers. Two workers racing on the same
/// file may both read it, but only the first result is stored.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Mutex<HashMap<String, Lines>>,
    windows: Mutex<HashMap<(String, u32, usize), Option<SourceWindow>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `2 * context + 1` lines centred on `center` (1-based), clipped at the
    /// file boundaries. `None` when the file can't be read or is empty.
    ///
    /// A centre past the end of the file is clamped to the last line.
    pub fn lines(&self, file: &str, center: u32, context: usize) -> Option<SourceWindow> {
        let key = (file.to_string(), center, context);
        if let Some(hit) = lock(&self.windows).get(&key) {
            return hit.clone();
        }

        let window = self
            .file_lines(file)
            .and_then(|lines| make_window(file, &lines, center, context));
        lock(&self.windows)
            .entry(key)
            .or_insert(window)
            .clone()
    }

    fn file_lines(&self, file: &str) -> Lines {
        if let Some(hit) = lock(&self.files).get(file) {
            return hit.clone();
        }

        let loaded = match fs::read(file) {
            Ok(bytes) => Some(Arc::new(
                String::from_utf8_lossy(&bytes)
                    .lines()
                    .map(str::to_string)
                    .collect::<Vec<_>>(),
            )),
            Err(e) => {
                debug!("Source unavailable {}: {}", file, e);
                None
            }
        };
        lock(&self.files)
            .entry(file.to_string())
            .or_insert(loaded)
            .clone()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Cached entries are written whole, a poisoned lock still holds valid data
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn make_window(file: &str, lines: &[String], center: u32, context: usize) -> Option<SourceWindow> {
    if lines.is_empty() {
        return None;
    }
    let count = lines.len();
    let center = (center.max(1) as usize).min(count);
    let first = center.saturating_sub(context).max(1);
    let last = center.saturating_add(context).min(count);

    Some(SourceWindow {
        file: file.to_string(),
        first_line: first as u32,
        lines: lines[first - 1..last].to_vec(),
    })
}
