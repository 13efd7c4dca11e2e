use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::{EntityId, EntityKind};

#[derive(Debug, Error, Diagnostic)]
pub enum OverviewError {
    #[error("unsuccessful connection with the LinkAhead DB at {url}: {reason}")]
    #[diagnostic(
        code(aba_overview::connection),
        help("contact the admin(s) for help")
    )]
    ConnectionFailure { url: String, reason: String },

    #[error(
        "record {record}: number of channels ({declared}) is not equal to number of wavelengths isolated ({resolved})"
    )]
    #[diagnostic(code(aba_overview::channel_mismatch))]
    ChannelMismatch {
        record: EntityId,
        declared: i64,
        resolved: usize,
    },

    #[error("expected exactly one {kind} with id {id}, found {matches}")]
    #[diagnostic(code(aba_overview::reference))]
    ReferenceResolution {
        kind: EntityKind,
        id: EntityId,
        matches: usize,
    },

    #[error("entity {entity} has no value for property `{property}`")]
    MissingProperty { entity: EntityId, property: String },

    #[error("entity {entity} has {count} values for property `{property}`, expected one")]
    AmbiguousProperty {
        entity: EntityId,
        property: String,
        count: usize,
    },

    #[error("entity {entity}: property `{property}` {message}")]
    InvalidValue {
        entity: EntityId,
        property: String,
        message: String,
    },

    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),

    #[error("invalid record type: {0}")]
    InvalidRecordType(String),

    #[error("LinkAhead request failed: {0}")]
    StoreHttp(String),

    #[error("LinkAhead returned status {status}: {message}")]
    StoreStatus { status: u16, message: String },

    #[error("failed to read store snapshot at {0}")]
    SnapshotRead(PathBuf),

    #[error("failed to parse store snapshot: {0}")]
    SnapshotParse(String),

    #[error("missing config file aba-overview.json")]
    #[diagnostic(help("pass --config, or place aba-overview.json in the current directory"))]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("no LinkAhead password configured")]
    #[diagnostic(help("set `linkahead.password` in the config or export LINKAHEAD_PASSWORD"))]
    MissingCredential,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("table row has {found} cells, expected {expected}")]
    TableShape { expected: usize, found: usize },

    #[error("export failed: {0}")]
    Export(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
