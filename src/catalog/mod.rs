//! Clip catalog.
//!
//! Static mapping from a symbolic clip key to its descriptor. The catalog is
//! built once at startup, either from the built-in clip list or from a JSON
//! file, and is never mutated afterwards.
//!
//! ```rust
//! use voicecue::catalog::{ClipCatalog, ClipResolver};
//!
//! let catalog = ClipCatalog::builtin(&ClipResolver::default());
//! let welcome = catalog.get("welcome").unwrap();
//! assert!(welcome.locator.ends_with("welcome.mp3"));
//! ```

mod error;
mod resolver;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::CatalogError;
pub use resolver::{validate_key, ClipResolver};

use crate::types::PlaybackConfig;

/// Immutable description of one clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipDescriptor {
    /// Symbolic key, e.g. `welcome`
    pub key: String,
    /// Location of the asset
    pub locator: PathBuf,
    /// Spoken text, used for logging and display
    pub text: String,
}

/// Built-in clips of the feedback flow: `(key, text)`.
const BUILTIN_CLIPS: &[(&str, &str)] = &[
    (
        "welcome",
        "Welcome! We'd love to hear about your experience. Please listen to this short introduction.",
    ),
    (
        "record_instructions",
        "Press the microphone button and tell us about your experience in your own words.",
    ),
    ("recording_started", "Recording. Speak whenever you are ready."),
    ("recording_stopped", "Recording stopped."),
    (
        "transcription_ready",
        "Your recording has been transcribed. Please check the text below.",
    ),
    (
        "rating_prompt",
        "How would you rate your experience? Choose from one to five stars.",
    ),
    ("thank_you", "Thank you for your feedback!"),
    (
        "help_recording",
        "To record, press the microphone button once to start and again to stop.",
    ),
    (
        "help_rating",
        "Tap a star to choose your rating. One is poor and five is excellent.",
    ),
    (
        "error_retry",
        "Something went wrong. Please try again in a moment.",
    ),
];

#[derive(Debug, Deserialize)]
struct CatalogFile {
    clips: Vec<CatalogFileEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogFileEntry {
    key: String,
    text: String,
    #[serde(default)]
    locator: Option<PathBuf>,
}

/// Key to descriptor map.
#[derive(Debug, Clone, Default)]
pub struct ClipCatalog {
    clips: BTreeMap<String, ClipDescriptor>,
}

impl ClipCatalog {
    /// Builds the built-in catalog, resolving every key with `resolver`.
    #[must_use]
    pub fn builtin(resolver: &ClipResolver) -> Self {
        let clips = BUILTIN_CLIPS
            .iter()
            .map(|(key, text)| {
                let descriptor = ClipDescriptor {
                    key: (*key).to_string(),
                    locator: resolver.locate(key),
                    text: (*text).to_string(),
                };
                ((*key).to_string(), descriptor)
            })
            .collect();
        Self { clips }
    }

    /// Builds a catalog from `(key, text)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid or duplicate keys.
    pub fn from_entries<'a, I>(resolver: &ClipResolver, entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut catalog = Self::default();
        for (key, text) in entries {
            catalog.insert(key, text, resolver.locate(key))?;
        }
        Ok(catalog)
    }

    /// Loads a catalog from a JSON file of the form
    /// `{"clips": [{"key": "...", "text": "...", "locator": "optional/path"}]}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds bad keys.
    pub fn load_file(path: &Path, resolver: &ClipResolver) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)?;

        let mut catalog = Self::default();
        for entry in file.clips {
            let locator = entry
                .locator
                .unwrap_or_else(|| resolver.locate(&entry.key));
            catalog.insert(&entry.key, &entry.text, locator)?;
        }
        debug!(path = %path.display(), clips = catalog.len(), "Loaded clip catalog");
        Ok(catalog)
    }

    /// Builds the catalog described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured catalog file is unusable.
    pub fn from_config(config: &PlaybackConfig) -> Result<Self, CatalogError> {
        let resolver = ClipResolver::new(&config.audio_dir, &config.extension);
        match &config.catalog_file {
            Some(path) => Self::load_file(path, &resolver),
            None => Ok(Self::builtin(&resolver)),
        }
    }

    fn insert(&mut self, key: &str, text: &str, locator: PathBuf) -> Result<(), CatalogError> {
        validate_key(key)?;
        if self.clips.contains_key(key) {
            return Err(CatalogError::DuplicateKey(key.to_string()));
        }
        self.clips.insert(
            key.to_string(),
            ClipDescriptor {
                key: key.to_string(),
                locator,
                text: text.to_string(),
            },
        );
        Ok(())
    }

    /// Looks up a clip.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ClipDescriptor> {
        self.clips.get(key)
    }

    /// Returns true if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.clips.contains_key(key)
    }

    /// Iterates over the clips in key order.
    pub fn iter(&self) -> impl Iterator<Item = &ClipDescriptor> {
        self.clips.values()
    }

    /// Number of clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Returns true if the catalog has no clips.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
