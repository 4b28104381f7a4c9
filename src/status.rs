use std::fmt;
use std::path::PathBuf;

/// One-line outcome of a run, as shown to the person who started it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success { records: usize, path: PathBuf },
    Failure(String),
}

impl Status {
    pub fn from_run<E: fmt::Display>(result: Result<(usize, PathBuf), E>) -> Self {
        match result {
            Ok((records, path)) => Status::Success { records, path },
            Err(e) => Status::Failure(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success { .. })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success { records, path } => write!(
                f,
                "✅ Extracted {} record{} to {}",
                records,
                if *records == 1 { "" } else { "s" },
                path.display()
            ),
            Status::Failure(message) => write!(f, "❌ {message}"),
        }
    }
}
