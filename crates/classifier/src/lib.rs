//! # Buildscope Classifier
//!
//! Assigns structural roles to build assets by content signatures.
//!
//! ## Rule chain
//!
//! ```text
//! stylesheet (content type or extension) ─> StyleSheet, no references
//! script ─> JavaScript
//!   ├─ chunk registration idiom            ─> + WebpackChunk (independent)
//!   └─ first match of:
//!        loader module map  ─> WebpackChunkLoader + chunk references
//!        vendor markers     ─> WebpackVendor
//!        >= 5 mapper keys   ─> WebpackStyleMapper
//!        app main markers   ─> AppMain (+ build number / version hash)
//! anything else ─> untagged
//! ```

mod analyzer;
mod classifier;
mod error;
mod signatures;

pub use analyzer::AssetAnalyzer;
pub use classifier::{Classification, ContentClassifier};
pub use error::{ClassifierError, Result};
pub use signatures::Signatures;
