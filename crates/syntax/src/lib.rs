//! # Buildscope Syntax
//!
//! Syntax-tree analysis of bundled, minified scripts.
//!
//! ## Architecture
//!
//! ```text
//! Script text
//!     │
//!     ├──> Tree-sitter Parsing → AST (syntax errors fail the whole parse)
//!     │
//!     ├──> NodeKind (closed enum over the grammar kinds we read)
//!     │
//!     ├──> LiteralEvaluator
//!     │    └─> object / array / primitive literals → JSON, never executes code
//!     │
//!     └──> ExperimentExtractor
//!          ├─> Visit every object literal in source order
//!          ├─> Keep the ones carrying `kind`, `id` and `label`
//!          └─> Serialize them into Experiment records (dedup by id)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use buildscope_syntax::ExperimentExtractor;
//!
//! let script = r#"e({kind:"user",id:"2024-01_demo",label:"Demo",treatments:[]})"#;
//! let experiments = ExperimentExtractor::new()?.extract(script)?;
//! assert_eq!(experiments[0].id, "2024-01_demo");
//! # Ok::<(), buildscope_syntax::SyntaxError>(())
//! ```

mod error;
mod experiment;
mod lexical;
mod literal;
mod node;
mod parser;

pub use error::{Result, SyntaxError};
pub use experiment::{ExperimentExtractor, ExperimentSet};
pub use lexical::{number_to_json, parse_number, unescape};
pub use literal::{evaluate_literal, LiteralEvaluator};
pub use node::NodeKind;
pub use parser::ScriptParser;
