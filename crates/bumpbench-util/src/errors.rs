use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all bumpbench operations.
#[derive(Debug, Error, Diagnostic)]
pub enum BumpbenchError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed configuration (tokens, search config, credentials).
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the paths passed via --api-tokens / --search-config / --benchmark-dir"))]
    Config { message: String },

    /// A Forge API call failed after exhausting retries, or returned an
    /// unexpected status.
    #[error("Forge error: {message}")]
    Forge { message: String },

    /// The container daemon rejected an operation or a container exited
    /// unexpectedly.
    #[error("Container error: {message}")]
    Container { message: String },

    /// A diff, POM, or JSON document could not be parsed.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A candidate could not be carried through mining or reproduction
    /// (e.g. the `:base` image could not be created).
    #[error("Candidate error ({commit}): {message}")]
    Candidate { commit: String, message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type BumpResult<T> = miette::Result<T>;
