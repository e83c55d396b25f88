pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by positional list access and list cursors.
///
/// Absent keys and values are not errors: mutating calls that receive an
/// absent value are no-ops, and a reclaimed value reads as absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Index out of range: {index} (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Cursor has no current element")]
    NoCurrentElement,
}

impl Error {
    pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}
