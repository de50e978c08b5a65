mod document;

pub use document::{
    load_json_document, parse_json_document, ContentErrorCode, ContentIssue, ContentLoadError,
    SourceLocation,
};
