use std::{
    fmt, fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use crate::record::BookmarkRecord;

pub const LOAD_FAILED_MESSAGE: &str =
    "Failed to load bookmarks. Please check that the bookmarks file exists.";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("bookmarks file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read bookmarks from {source_name}: {error}")]
    Read {
        source_name: String,
        #[source]
        error: io::Error,
    },

    #[error("malformed bookmarks in {source_name}: {error}")]
    Malformed {
        source_name: String,
        #[source]
        error: serde_json::Error,
    },
}

impl LoadError {
    /// Every load failure surfaces as the same message.
    pub fn user_message(&self) -> &'static str {
        LOAD_FAILED_MESSAGE
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookmarkSource {
    File(PathBuf),
    Stdin,
}

impl BookmarkSource {
    pub fn from_arg(raw: &str) -> Self {
        if raw == "-" {
            BookmarkSource::Stdin
        } else {
            BookmarkSource::File(PathBuf::from(raw))
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, BookmarkSource::Stdin)
    }
}

impl fmt::Display for BookmarkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkSource::File(path) => write!(f, "{}", path.display()),
            BookmarkSource::Stdin => f.write_str("<stdin>"),
        }
    }
}

/// The full, unfiltered collection. Never mutated after load.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    records: Vec<BookmarkRecord>,
}

impl RecordStore {
    pub fn new(records: Vec<BookmarkRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[BookmarkRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&BookmarkRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn load(source: &BookmarkSource) -> Result<RecordStore, LoadError> {
    let source_name = source.to_string();
    let contents = match source {
        BookmarkSource::File(path) => read_file(path)?,
        BookmarkSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|error| LoadError::Read {
                    source_name: source_name.clone(),
                    error,
                })?;
            buffer
        }
    };
    let store = parse(&source_name, &contents)?;
    tracing::info!(source = %source_name, count = store.len(), "loaded bookmarks");
    Ok(store)
}

pub fn parse(source_name: &str, contents: &str) -> Result<RecordStore, LoadError> {
    let records: Vec<BookmarkRecord> =
        serde_json::from_str(contents).map_err(|error| LoadError::Malformed {
            source_name: source_name.to_string(),
            error,
        })?;
    Ok(RecordStore::new(records))
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|error| {
        if error.kind() == io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Read {
                source_name: path.display().to_string(),
                error,
            }
        }
    })
}
