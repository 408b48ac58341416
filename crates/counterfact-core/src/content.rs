//! Read-only cache of pre-generated narration and media, keyed by content
//! key (`main-<i>`, `branch-<e>-<b>`, `branch-<e>-<b>-cont-<i>`).

use std::collections::BTreeMap;
use std::path::Path;

use counterfact_types::PregeneratedContent;

use crate::config::ConfigError;

/// Pre-generated content by content key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentCache {
    entries: BTreeMap<String, PregeneratedContent>,
}

impl ContentCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache over the given entries.
    pub const fn from_entries(entries: BTreeMap<String, PregeneratedContent>) -> Self {
        Self { entries }
    }

    /// Parse a YAML mapping of content key to content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the document does not parse.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let entries: BTreeMap<String, PregeneratedContent> = serde_yml::from_str(yaml)?;
        Ok(Self { entries })
    }

    /// Load a YAML content file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Yaml`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Content for a key.
    pub fn get(&self, key: &str) -> Option<&PregeneratedContent> {
        self.entries.get(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_entries() {
        let cache = ContentCache::parse(
            r#"
main-0:
  narrationText: "Dawn over the border."
  anchorImageUrl: /media/main-0.jpg
branch-2-0-cont-1:
  audioUrl: /media/b.mp3
"#,
        )
        .unwrap();
        assert_eq!(cache.len(), 2);
        let main = cache.get("main-0").unwrap();
        assert_eq!(main.narration_text.as_deref(), Some("Dawn over the border."));
        assert_eq!(main.audio_url, None);
        assert!(cache.get("branch-2-0-cont-1").unwrap().narration_text.is_none());
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn empty_mapping_parses_and_sequence_fails() {
        assert!(ContentCache::parse("{}").unwrap().is_empty());
        assert!(ContentCache::parse("- not a map").is_err());
    }
}
