use crate::Result;
use crate::assets;
use crate::error::TemplateError;
use dashmap::DashMap;
use log::trace;
use std::fs;
use std::path::PathBuf;

/// Supplies raw template text by logical name.
///
/// Used by [`Handlebars::compile`](crate::Handlebars::compile) and for every
/// `{{> partial}}`. Implementations fail with [`TemplateError::NotFound`] when
/// the name does not exist.
pub trait TemplateSource: Send + Sync {
    fn resolve(&self, name: &str) -> Result<String>;
}

/// Maps a logical template name to a location: `prefix + "/" + name + suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    prefix: String,
    suffix: String,
}

impl Default for Location {
    fn default() -> Self {
        Self::new("/", ".hbs")
    }
}

impl Location {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Builds the location of `name`, never doubling the separator.
    ///
    /// ```
    /// use ubars::Location;
    ///
    /// let location = Location::new("/templates", ".hbs");
    /// assert_eq!(location.path_for("home"), "/templates/home.hbs");
    /// ```
    pub fn path_for(&self, name: &str) -> String {
        let name = name.trim_start_matches('/');
        let mut path = String::with_capacity(self.prefix.len() + name.len() + self.suffix.len() + 1);
        path.push_str(&self.prefix);
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(name);
        path.push_str(&self.suffix);
        path
    }
}

/// Reads templates from the filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
    location: Location,
}

impl FileSource {
    /// `root` is the directory the location's path is taken relative to.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            location: Location::default(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.location.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.location.suffix = suffix.into();
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

impl TemplateSource for FileSource {
    fn resolve(&self, name: &str) -> Result<String> {
        let location = self.location.path_for(name);
        let path = self.root.join(location.trim_start_matches('/'));
        trace!("Resolving template '{}' from file {}", name, path.display());
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TemplateError::NotFound(location))
            }
            Err(e) => Err(TemplateError::TemplateLoad(format!(
                "failed to read '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Reads templates from the embedded asset store, see [`crate::assets`].
#[derive(Debug, Clone, Default)]
pub struct AssetSource {
    location: Location,
}

impl AssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.location.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.location.suffix = suffix.into();
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

impl TemplateSource for AssetSource {
    fn resolve(&self, name: &str) -> Result<String> {
        let key = self.location.path_for(name);
        trace!("Resolving template '{}' from asset {}", name, key);
        assets::find(&key)
            .map(|text| text.to_string())
            .ok_or(TemplateError::NotFound(key))
    }
}

/// Templates held in memory, keyed by the location path.
#[derive(Debug, Default)]
pub struct MemorySource {
    location: Location,
    templates: DashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.location.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.location.suffix = suffix.into();
        self
    }

    /// Adds a template under its logical name.
    pub fn with(self, name: &str, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&self, name: &str, text: impl Into<String>) {
        self.templates
            .insert(self.location.path_for(name), text.into());
    }
}

impl TemplateSource for MemorySource {
    fn resolve(&self, name: &str) -> Result<String> {
        let key = self.location.path_for(name);
        self.templates
            .get(&key)
            .map(|t| t.value().clone())
            .ok_or(TemplateError::NotFound(key))
    }
}
