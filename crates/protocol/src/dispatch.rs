use crate::asset::AssetMetadata;
use serde::{Deserialize, Serialize};

/// Request handed to a classification worker. Answered by exactly one
/// `Asset` or one failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub name: String,
    pub metadata: AssetMetadata,
}

impl ClassifyRequest {
    pub fn new(name: impl Into<String>, metadata: AssetMetadata) -> Self {
        Self {
            name: name.into(),
            metadata,
        }
    }
}
