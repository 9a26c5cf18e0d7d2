//! Clip asset resolution.
//!
//! Maps a symbolic clip key to the location of its pre-rendered asset
//! (`{audio_dir}/{key}.{extension}`). This is the only place that knows where
//! assets live.

use std::path::{Path, PathBuf};

use super::error::CatalogError;

/// Resolves clip keys to asset locators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipResolver {
    audio_dir: PathBuf,
    extension: String,
}

impl ClipResolver {
    /// Creates a resolver rooted at `audio_dir`.
    #[must_use]
    pub fn new(audio_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            audio_dir: audio_dir.into(),
            extension: extension.into(),
        }
    }

    /// Returns the locator for `key`.
    ///
    /// Pure and deterministic; does not check that the file exists.
    #[must_use]
    pub fn locate(&self, key: &str) -> PathBuf {
        self.audio_dir.join(format!("{}.{}", key, self.extension))
    }

    /// Returns the directory assets are resolved against.
    #[must_use]
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Returns the asset extension.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl Default for ClipResolver {
    fn default() -> Self {
        Self::new("/audio", "mp3")
    }
}

/// Checks that a clip key is safe to splice into a path.
///
/// Keys are lowercase ASCII letters, digits, `_` and `-`, so a resolved
/// locator can never escape the audio directory.
///
/// # Errors
///
/// Returns `CatalogError::InvalidKey` for empty keys or keys with other characters.
pub fn validate_key(key: &str) -> Result<(), CatalogError> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_default() {
        let resolver = ClipResolver::default();
        assert_eq!(resolver.locate("welcome"), PathBuf::from("/audio/welcome.mp3"));
    }

    #[test]
    fn test_locate_custom_dir_and_extension() {
        let resolver = ClipResolver::new("/srv/clips", "ogg");
        assert_eq!(
            resolver.locate("thank_you"),
            PathBuf::from("/srv/clips/thank_you.ogg")
        );
        assert_eq!(resolver.extension(), "ogg");
        assert_eq!(resolver.audio_dir(), Path::new("/srv/clips"));
    }

    #[test]
    fn test_validate_key_accepts_symbolic_keys() {
        assert!(validate_key("welcome").is_ok());
        assert!(validate_key("help_rating").is_ok());
        assert!(validate_key("step-2").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("Welcome").is_err());
    }
}
