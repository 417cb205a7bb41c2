use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CycError {
    #[error("invalid BioCyc object identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("{kind} is invalid: required field `{field}` has no value in {node}")]
    ObjectInvalid {
        kind: String,
        field: String,
        node: String,
    },

    #[error("BioCyc object not found: {identity} (detail: {})", .detail.as_deref().unwrap_or("default"))]
    ObjectNotFound {
        identity: String,
        detail: Option<String>,
    },

    #[error("unknown record kind: {0}")]
    UnknownKind(String),

    #[error("{kind} has no field named `{field}`")]
    UnknownField { kind: String, field: String },

    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("cannot cast {text:?} to {scalar}")]
    InvalidValue { scalar: String, text: String },

    #[error("cannot cast {node} to {scalar}: not an attribute, text or CDATA node")]
    InvalidNodeKind { scalar: String, node: String },

    #[error("relationship `{field}` points at a record that no longer exists")]
    DanglingReference { field: String },

    #[error("malformed XML document: {0}")]
    Xml(String),

    #[error("BioCyc request failed: {0}")]
    Http(String),

    #[error("BioCyc returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode BioCyc response: {0}")]
    Decode(String),

    #[error("malformed atom mapping: {0}")]
    InvalidAtomMapping(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl CycError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CycError::ObjectNotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CycError::Http(_) | CycError::Status { .. } | CycError::Decode(_)
        )
    }
}
