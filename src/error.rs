//! Error types for the hard-failure paths of spec §7. Resource exhaustion
//! and instrumentation misuse are soft degradations (logged, not returned)
//! and don't appear here — see [`crate::registry`] and
//! [`crate::instrumentation`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("no function with a known address was found; gmon.out emission aborted")]
    NoKnownAddresses,

    #[error("could not create {path}: {source}")]
    GmonFileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing {path}: {source}")]
    GmonFileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not create {path}: {source}")]
    DotFileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing {path}: {source}")]
    DotFileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("external target {path} not found")]
    ExternalTargetMissing { path: PathBuf },

    #[error("could not spawn {path}: {source}")]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("target process exited with status {0}")]
    TargetExitedNonZero(i32),

    #[error("no gmon.out was produced by the target; compile it for profiling and rerun")]
    MissingGmonArtifact,

    #[error("gprof failed: {0}")]
    AnalyserFailed(String),

    #[error("could not create temporary directory: {0}")]
    TempDirCreate(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProfilerError>;
