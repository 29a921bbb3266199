use std::path::PathBuf;

/// Mistakes the user can fix by changing their input. Anything else travels
/// as a plain `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0} is required")]
    EmptyField(&'static str),

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("No document with id {0}")]
    DocumentNotFound(i64),

    #[error("Unsupported config key: {0}")]
    UnknownConfigKey(String),

    #[error("{key} {reason}")]
    InvalidConfigValue { key: &'static str, reason: String },
}

/// Returns the user-facing error buried in an `anyhow` chain, if any.
pub fn find_user_error(error: &anyhow::Error) -> Option<&UserError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<UserError>())
}
