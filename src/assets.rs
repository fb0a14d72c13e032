//! Process-wide store of template text, keyed by absolute-style paths such as
//! `/templates/home.hbs`.
//!
//! Entries arrive either at startup from [`template_assets!`](crate::template_assets)
//! or at runtime through [`load`]. [`AssetSource`](crate::loader::AssetSource)
//! reads from here.

use crate::Result;
use crate::error::TemplateError;
use dashmap::DashMap;
use glob::glob;
use log::{debug, warn};
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

static ASSETS: OnceLock<DashMap<String, Arc<str>>> = OnceLock::new();

fn store() -> &'static DashMap<String, Arc<str>> {
    ASSETS.get_or_init(DashMap::new)
}

/// Loads every file under `root` matching `pattern`.
///
/// Keys are the file paths relative to `root`, with a leading `/`:
/// `load("tests/resources", "templates/*.hbs")` registers
/// `/templates/home.hbs` and so on. Returns the number of files loaded.
pub fn load(root: impl AsRef<Path>, pattern: &str) -> Result<usize> {
    let root = root.as_ref();
    let full_pattern = root.join(pattern);
    let paths = glob(&full_pattern.to_string_lossy()).map_err(|e| {
        TemplateError::TemplateLoad(format!("invalid glob pattern '{}': {}", pattern, e))
    })?;

    let mut count = 0;
    for entry in paths {
        let path = entry.map_err(|e| {
            TemplateError::TemplateLoad(format!("cannot read path for '{}': {}", pattern, e))
        })?;
        if !path.is_file() {
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|e| {
            TemplateError::TemplateLoad(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let relative = path.strip_prefix(root).unwrap_or(&path);
        insert(&asset_key(relative), &text);
        count += 1;
    }
    debug!("Loaded {} template asset(s) from '{}'", count, full_pattern.display());
    Ok(count)
}

/// Registers embedded `(key, text)` pairs, normally generated by
/// [`template_assets!`](crate::template_assets).
pub fn load_assets(assets: Vec<(&str, &str)>) -> Result<()> {
    for (key, text) in assets {
        if key.is_empty() {
            return Err(TemplateError::TemplateLoad(
                "embedded asset without a path".to_string(),
            ));
        }
        insert(&normalize(key), text);
    }
    Ok(())
}

/// Looks up an asset by key. A missing leading `/` is tolerated.
pub fn find(key: &str) -> Option<Arc<str>> {
    store()
        .get(normalize(key).as_str())
        .map(|v| v.value().clone())
}

/// Removes every loaded asset.
pub fn clear() {
    store().clear();
}

fn insert(key: &str, text: &str) {
    if store().insert(key.to_string(), Arc::from(text)).is_some() {
        warn!("Template asset '{}' loaded twice, keeping the latest", key);
    }
}

fn asset_key(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", parts.join("/"))
}

fn normalize(key: &str) -> String {
    let key = key.replace('\\', "/");
    if key.starts_with('/') {
        key
    } else {
        format!("/{}", key)
    }
}
