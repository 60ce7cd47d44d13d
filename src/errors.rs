use std::fmt;

/// Fatal engine-level failures: anything that leaves the pager or the
/// on-disk file in a state the caller cannot recover from. Callers
/// propagate these with `?`; the REPL binary is the only place they
/// get turned into a process exit code.
#[derive(Debug)]
pub enum DbError {
    Io(std::io::Error),
    /// File length at open time was not a whole multiple of `PAGE_SIZE`.
    Corrupt(String),
    /// A page number fell outside `[0, TABLE_MAX_PAGES)`.
    PageOutOfBounds(u32),
    /// Any other invariant the pager/tree discovered violated.
    Storage(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Io(e) => write!(f, "I/O error: {}", e),
            DbError::Corrupt(msg) => write!(f, "Corrupt database file: {}", msg),
            DbError::PageOutOfBounds(n) => write!(f, "Tried to fetch page number out of bounds: {}", n),
            DbError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for DbError {}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> DbError {
        DbError::Io(err)
    }
}

/// Statement-preparation errors, owned by the command layer rather than
/// the engine: parsing and validating input text is a REPL concern,
/// separate from failures the storage engine itself can raise.
#[derive(Debug, PartialEq, Eq)]
pub enum PrepareError {
    SyntaxError,
    NegativeId,
    StringTooLong,
    UnrecognizedKeyword(String),
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepareError::SyntaxError => write!(f, "Syntax error. Could not parse statement."),
            PrepareError::NegativeId => write!(f, "ID must be positive."),
            PrepareError::StringTooLong => write!(f, "String is too long."),
            PrepareError::UnrecognizedKeyword(buf) => {
                write!(f, "Unrecognized keyword at start of '{}'.", buf)
            }
        }
    }
}
