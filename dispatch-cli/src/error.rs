//! Error types emitted by the dispatch CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use dispatch_core::{GeoError, StoreError};
#[cfg(feature = "http-routing")]
use dispatch_data::routing::ProviderBuildError;
use dispatch_service::DispatchError;
use thiserror::Error;

/// Errors emitted by the dispatch CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        feature: &'static str,
        action: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A numeric option is out of range.
    #[error("{field} is out of range: {value}")]
    InvalidNumber { field: &'static str, value: f64 },
    /// An avoidance point is not a `lat,lng` pair.
    #[error("avoid point {value:?} is not a valid lat,lng pair")]
    InvalidAvoidPoint { value: String },
    /// Opening the fleet snapshot failed.
    #[error("failed to open fleet snapshot at {path:?}: {source}")]
    OpenSnapshot {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Fleet snapshot JSON could not be decoded.
    #[error("failed to parse fleet snapshot JSON at {path:?}: {source}")]
    ParseSnapshot {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The fleet snapshot breaks the order and courier rules.
    #[error("fleet snapshot in {path:?} is inconsistent: {source}")]
    InvalidSnapshot {
        path: Utf8PathBuf,
        #[source]
        source: StoreError,
    },
    /// Writing the updated fleet snapshot failed.
    #[error("failed to write fleet snapshot to {path:?}: {source}")]
    WriteSnapshot {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Reading the fleet back from the in-memory store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A coordinate supplied on the command line was invalid.
    #[error(transparent)]
    Geo(#[from] GeoError),
    /// The dispatch engine rejected the operation.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Starting the async runtime failed.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Constructing the road-routing provider failed.
    #[cfg(feature = "http-routing")]
    #[error("failed to build road-routing provider for {base_url:?}: {source}")]
    BuildRouteProvider {
        base_url: String,
        #[source]
        source: ProviderBuildError,
    },
    /// Serializing the command output failed.
    #[error("failed to serialize command output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing the command output failed.
    #[error("failed to write command output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
