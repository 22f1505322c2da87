use derive_more::Display;

/// Errors raised while building, opening or streaming a grid.
///
/// All of them are fatal for the operation that produced them.
#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "I/O error: {}", _0)]
    Io(std::io::Error),
    #[display(fmt = "SQLite error: {}", _0)]
    Sqlite(rusqlite::Error),
    #[display(fmt = "corrupt metadata: {}", _0)]
    CorruptMeta(String),
    #[display(fmt = "corrupt block ({}, {}): {}", row, col, reason)]
    CorruptBlock {
        row: usize,
        col: usize,
        reason: String,
    },
    #[display(fmt = "malformed input: {}", _0)]
    MalformedInput(String),
    #[display(
        fmt = "memory budget of {} bytes is too small, at least {} bytes required",
        budget,
        required
    )]
    BudgetTooSmall { budget: u64, required: u64 },
    #[display(fmt = "cannot start workers: {}", _0)]
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Sqlite(e) => Some(e),
            Error::ThreadPool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Sqlite(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Error::ThreadPool(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
