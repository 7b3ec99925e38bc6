//! Typed error families, one per component.
//!
//! Library code returns these; the CLI binary wraps them with `anyhow`
//! context on the way to a process exit code.

use std::path::PathBuf;

/// Errors from loading the prior-types JSON file (§4.2).
#[derive(Debug, thiserror::Error)]
pub enum PriorTypesError {
    #[error("could not read prior-types file {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse prior-types JSON {}: {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
}

/// Errors from loading a protocol/message definition (MAVLink, CMASI, LMCP).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolLoadError {
    #[error("could not read protocol definition file {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse protocol XML {}: {source}", path.display())]
    Xml { path: PathBuf, source: quick_xml::Error },
    #[error("unsupported definition file: root element must be `MDM` or `mavlink`, found `{0}`")]
    UnsupportedRoot(String),
    #[error("flex-module API request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("a concurrent struct download for {url} panicked: {source}")]
    TaskJoin { url: String, source: tokio::task::JoinError },
}

/// Errors surfaced by the on-disk TU cache (§4.4).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("could not create cache directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("could not write cache file {}: {source}", path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not serialize cache entry for {}: {source}", path.display())]
    Serialize { path: PathBuf, source: serde_json::Error },
}

/// Errors surfaced by the TU pipeline driver (§4.4).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("compilation database at {} could not be read: {source}", path.display())]
    CompilationDatabase { path: PathBuf, source: std::io::Error },
    #[error("a worker thread panicked while analyzing {}", file.display())]
    WorkerPanicked { file: PathBuf },
}

/// Errors surfaced while configuring or invoking the global solver (§4.5).
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("the global solver reported `unknown` (possibly timed out)")]
    Unknown,
}
