use crate::asset::{Asset, BuildInfo};
use crate::channel::{BuildEnv, ReleaseChannel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fully crawled build of the web client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    /// Content hash identifying the manifest.
    pub id: String,
    pub release_channel: ReleaseChannel,
    pub build_env: BuildEnv,
    pub date: Option<DateTime<Utc>>,
    /// Runtime configuration object embedded in the manifest.
    pub runtime_config: serde_json::Value,
    pub assets: Vec<Asset>,
    /// Names referenced directly by the manifest.
    pub root_assets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<BuildInfo>,
}

impl Build {
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    /// Total number of experiments across all assets.
    pub fn experiment_count(&self) -> usize {
        self.assets.iter().map(|asset| asset.experiments.len()).sum()
    }
}
