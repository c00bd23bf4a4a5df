//! Theme engine error types

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading or rendering page templates
#[derive(Debug, Error)]
pub enum ThemeError {
    /// An embedded or override file is not valid UTF-8
    #[error("Template {0} is not UTF-8")]
    NotUtf8(String),

    /// A file under the override directory could not be named
    #[error("Template path {0:?} is outside the override directory")]
    OutsideOverrideDir(PathBuf),

    /// Tera rejected the template set
    #[error("Failed to load templates: {0}")]
    Load(String),

    /// Rendering failed; `message` carries Tera's cause chain
    #[error("Failed to render '{template}': {message}")]
    Render { template: String, message: String },
}
