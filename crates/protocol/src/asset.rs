use crate::experiment::Experiment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structural role assigned to an asset by content signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetTag {
    StyleSheet,
    JavaScript,
    /// Registers modules with the bundler runtime. Orthogonal to the other script roles.
    WebpackChunk,
    /// Maps module ids to chunk hashes; the source of further references.
    WebpackChunkLoader,
    WebpackVendor,
    /// Maps local identifiers to generated CSS class names.
    WebpackStyleMapper,
    /// The main application bundle.
    AppMain,
}

/// Response metadata and body of one fetched asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Absent until the body has been read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl AssetMetadata {
    /// MIME essence of the content type: lowercased, parameters dropped.
    pub fn mime(&self) -> Option<String> {
        let raw = self.content_type.as_deref()?;
        let essence = raw.split(';').next().unwrap_or_default().trim();
        if essence.is_empty() {
            None
        } else {
            Some(essence.to_ascii_lowercase())
        }
    }
}

/// Release identifiers printed by the application bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub build_number: u32,
    pub version_hash: String,
}

/// A classified asset. Never mutated once produced by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// File name including content hash and extension; unique within a build.
    pub name: String,
    pub tags: Vec<AssetTag>,
    /// Names of further assets this one may load.
    pub references: Vec<String>,
    pub experiments: Vec<Experiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<BuildInfo>,
    pub metadata: AssetMetadata,
}

impl Asset {
    pub fn has_tag(&self, tag: AssetTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Copy of the record without the raw body, for persistence.
    #[must_use]
    pub fn without_text(&self) -> Self {
        let mut copy = self.clone();
        copy.metadata.text = None;
        copy
    }
}
