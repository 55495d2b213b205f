use crate::error::{ClassifierError, Result};
use crate::signatures::Signatures;
use buildscope_protocol::{AssetMetadata, AssetTag, BuildInfo};
use buildscope_syntax::LiteralEvaluator;
use serde_json::Value;

const STYLESHEET_MIME: &str = "text/css";
const SCRIPT_MIMES: [&str; 3] = [
    "application/javascript",
    "text/javascript",
    "application/x-javascript",
];

/// Outcome of the signature rules for one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub tags: Vec<AssetTag>,
    pub references: Vec<String>,
    pub build_info: Option<BuildInfo>,
}

impl Classification {
    pub fn has_tag(&self, tag: AssetTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Ordered rule chain over an asset's text and metadata.
///
/// Deterministic: the same input always yields the same classification.
pub struct ContentClassifier {
    signatures: Signatures,
    evaluator: LiteralEvaluator,
}

impl ContentClassifier {
    pub fn new(signatures: Signatures) -> Result<Self> {
        Ok(Self {
            signatures,
            evaluator: LiteralEvaluator::new()?,
        })
    }

    pub fn signatures(&self) -> &Signatures {
        &self.signatures
    }

    pub fn classify(&mut self, name: &str, metadata: &AssetMetadata) -> Result<Classification> {
        let text = metadata
            .text
            .as_deref()
            .ok_or_else(|| ClassifierError::MissingContent(name.to_string()))?;
        let mime = metadata.mime();

        if mime.as_deref() == Some(STYLESHEET_MIME)
            || name.ends_with(&self.signatures.stylesheet_extension)
        {
            // References inside stylesheet bodies are not followed.
            return Ok(Classification {
                tags: vec![AssetTag::StyleSheet],
                ..Classification::default()
            });
        }

        if !mime.as_deref().is_some_and(|m| SCRIPT_MIMES.contains(&m)) {
            return Ok(Classification::default());
        }

        let mut classification = Classification {
            tags: vec![AssetTag::JavaScript],
            ..Classification::default()
        };
        if self.signatures.is_chunk(text) {
            classification.tags.push(AssetTag::WebpackChunk);
        }

        // Script roles: first match wins.
        if let Some(references) = self.loader_references(text)? {
            log::debug!("{name}: chunk loader with {} reference(s)", references.len());
            classification.references = references;
            classification.tags.push(AssetTag::WebpackChunkLoader);
        } else if self.signatures.is_vendor(text) {
            classification.tags.push(AssetTag::WebpackVendor);
        } else if self.signatures.is_style_mapper(text) {
            classification.tags.push(AssetTag::WebpackStyleMapper);
        } else if self.signatures.is_app_main(text) {
            classification.tags.push(AssetTag::AppMain);
            classification.build_info = self.build_info(text);
        }

        Ok(classification)
    }

    /// Chunk file names listed in the loader's module map, ordered by
    /// ascending numeric chunk id (non-numeric keys last).
    fn loader_references(&mut self, text: &str) -> Result<Option<Vec<String>>> {
        let Some(literal) = self.signatures.loader_map_literal(text) else {
            return Ok(None);
        };
        let mapping = self.evaluator.evaluate(literal)?;

        let mut references: Vec<String> = Vec::new();
        if let Value::Object(entries) = mapping {
            let mut entries: Vec<(&String, &Value)> = entries.iter().collect();
            entries.sort_by(|(a, _), (b, _)| chunk_id_order(a).cmp(&chunk_id_order(b)));
            for hash in entries.into_iter().filter_map(|(_, value)| value.as_str()) {
                let reference = format!("{hash}{}", self.signatures.script_extension);
                if !references.contains(&reference) {
                    references.push(reference);
                }
            }
        }
        Ok(Some(references))
    }

    fn build_info(&self, text: &str) -> Option<BuildInfo> {
        let captures = self.signatures.build_info.captures(text)?;
        Some(BuildInfo {
            build_number: captures.get(1)?.as_str().parse().ok()?,
            version_hash: captures.get(2)?.as_str().to_string(),
        })
    }
}

/// Numeric chunk ids sort by value; anything else after them, by text.
fn chunk_id_order(key: &str) -> (bool, u64, &str) {
    match key.parse::<u64>() {
        Ok(id) => (false, id, ""),
        Err(_) => (true, 0, key),
    }
}
