//! # Buildscope Protocol
//!
//! Records exchanged between the crawler, the classification workers and the
//! persistence layer.
//!
//! ```text
//! Manifest ──> Build
//!               ├─ id / channel / env / date
//!               ├─ runtime_config (opaque JSON)
//!               ├─ root_assets: [name]
//!               └─ assets: [Asset]
//!                    ├─ tags
//!                    ├─ references: [name]
//!                    ├─ experiments: [Experiment]
//!                    └─ metadata (content type, last modified, text)
//! ```

mod asset;
mod build;
mod channel;
mod dispatch;
mod experiment;

pub use asset::{Asset, AssetMetadata, AssetTag, BuildInfo};
pub use build::Build;
pub use channel::{BuildEnv, ReleaseChannel, UnknownChannel};
pub use dispatch::ClassifyRequest;
pub use experiment::{Experiment, ExperimentKind, ExperimentTreatment};
