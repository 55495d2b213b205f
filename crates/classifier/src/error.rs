use buildscope_syntax::SyntaxError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    #[error("Asset {0} has no content to classify")]
    MissingContent(String),
}

impl ClassifierError {
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Syntax(err) if err.is_parse_error())
    }
}
