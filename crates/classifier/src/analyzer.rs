use crate::classifier::ContentClassifier;
use crate::error::{ClassifierError, Result};
use crate::signatures::Signatures;
use buildscope_protocol::{Asset, AssetTag, ClassifyRequest};
use buildscope_syntax::ExperimentExtractor;

/// Classification plus experiment extraction for one asset.
///
/// Holds its own parsers, so each worker thread owns one analyzer.
pub struct AssetAnalyzer {
    classifier: ContentClassifier,
    extractor: ExperimentExtractor,
}

impl AssetAnalyzer {
    pub fn new(signatures: Signatures) -> Result<Self> {
        Ok(Self {
            classifier: ContentClassifier::new(signatures)?,
            extractor: ExperimentExtractor::new()?,
        })
    }

    pub fn analyze(&mut self, request: ClassifyRequest) -> Result<Asset> {
        let ClassifyRequest { name, metadata } = request;
        let classification = self.classifier.classify(&name, &metadata)?;

        let experiments = if classification.has_tag(AssetTag::JavaScript) {
            let text = metadata
                .text
                .as_deref()
                .ok_or_else(|| ClassifierError::MissingContent(name.clone()))?;
            self.extractor.extract(text)?
        } else {
            Vec::new()
        };
        if !experiments.is_empty() {
            log::debug!("{name}: {} experiment(s)", experiments.len());
        }

        Ok(Asset {
            name,
            tags: classification.tags,
            references: classification.references,
            experiments,
            build_info: classification.build_info,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildscope_protocol::AssetMetadata;

    fn request(name: &str, content_type: &str, text: &str) -> ClassifyRequest {
        ClassifyRequest::new(
            name,
            AssetMetadata {
                content_type: Some(content_type.into()),
                last_modified: None,
                text: Some(text.into()),
            },
        )
    }

    #[test]
    fn scripts_carry_experiments() {
        let mut analyzer = AssetAnalyzer::new(Signatures::default()).unwrap();
        let asset = analyzer
            .analyze(request(
                "app.js",
                "application/javascript",
                r#"x({kind:"user",id:"2024-02_x",label:"X"})"#,
            ))
            .unwrap();
        assert_eq!(asset.name, "app.js");
        assert_eq!(asset.experiments.len(), 1);
        assert!(asset.metadata.text.is_some());
    }

    #[test]
    fn stylesheets_skip_the_parser() {
        let mut analyzer = AssetAnalyzer::new(Signatures::default()).unwrap();
        // Not valid script; would fail if it reached the extractor.
        let asset = analyzer
            .analyze(request("s.css", "text/css", ".a{color:red}"))
            .unwrap();
        assert_eq!(asset.tags, vec![AssetTag::StyleSheet]);
        assert!(asset.experiments.is_empty());
    }

    #[test]
    fn script_syntax_errors_surface_as_parse_errors() {
        let mut analyzer = AssetAnalyzer::new(Signatures::default()).unwrap();
        let err = analyzer
            .analyze(request("bad.js", "text/javascript", "function ("))
            .unwrap_err();
        assert!(err.is_parse_error(), "{err:?}");
    }
}
