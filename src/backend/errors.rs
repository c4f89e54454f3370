use std::path::PathBuf;

/// Business-rule failures. These never touch the disk; the record that caused
/// them was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("time slot overlaps existing entry {existing_id} ({existing})")]
    Overlap { existing_id: u32, existing: String },

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("value is {actual} bytes, limit is {max}")]
    TooLong { max: usize, actual: usize },

    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("invalid id '{0}'")]
    InvalidId(String),

    #[error("passwords do not match")]
    PasswordMismatch,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store is full ({capacity} records)")]
    CapacityExceeded { capacity: usize },

    #[error("no ids left to assign")]
    IdsExhausted,

    #[error("a record with key '{0}' already exists")]
    DuplicateKey(String),

    #[error("no record matches '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures where the data on disk may not match what the
    /// caller asked for.
    pub fn is_io(&self) -> bool {
        matches!(self, StoreError::Io { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
