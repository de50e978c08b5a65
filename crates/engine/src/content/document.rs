use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::error::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    JsonMalformed,
    InvalidValue,
}

/// A content document that could not be loaded. Carries the JSON field path of
/// the offending value when the document parsed but did not match the schema.
#[derive(Debug, Clone)]
pub struct ContentLoadError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub field_path: Option<String>,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)?;
        if let Some(field_path) = &self.field_path {
            write!(f, " (at {field_path})")?;
        }
        match self.location {
            Some(loc) => write!(
                f,
                " (file={}, line={}, column={})",
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(f, " (file={})", self.file_path.display()),
        }
    }
}

impl std::error::Error for ContentLoadError {}

/// Non-fatal content problem found while validating a loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIssue {
    pub path: String,
    pub message: String,
}

impl ContentIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

pub fn load_json_document<T: DeserializeOwned>(path: &Path) -> Result<T, ContentLoadError> {
    let raw = fs::read_to_string(path).map_err(|error| ContentLoadError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read content file: {error}"),
        file_path: path.to_path_buf(),
        field_path: None,
        location: None,
    })?;
    parse_json_document(&raw, path)
}

/// `file_path` only labels errors; nothing is read from disk.
pub fn parse_json_document<T: DeserializeOwned>(
    raw: &str,
    file_path: &Path,
) -> Result<T, ContentLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let value = serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        let code = match source.classify() {
            Category::Data => ContentErrorCode::InvalidValue,
            Category::Syntax | Category::Eof | Category::Io => ContentErrorCode::JsonMalformed,
        };
        let location = (source.line() > 0).then(|| SourceLocation {
            line: source.line(),
            column: source.column(),
        });
        ContentLoadError {
            code,
            message: source.to_string(),
            file_path: file_path.to_path_buf(),
            field_path: (!path.is_empty() && path != ".").then_some(path),
            location,
        }
    })?;
    deserializer.end().map_err(|error| ContentLoadError {
        code: ContentErrorCode::JsonMalformed,
        message: format!("trailing content after document: {error}"),
        file_path: file_path.to_path_buf(),
        field_path: None,
        location: Some(SourceLocation {
            line: error.line(),
            column: error.column(),
        }),
    })?;
    Ok(value)
}
