use thiserror::Error;

/// Failures at the platform boundary. These never cross the public API:
/// probes absorb them into a light-theme answer and watchers absorb them
/// by terminating; they only show up in logs.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed monitor output: {0:?}")]
    MalformedOutput(String),

    #[error("query produced no output")]
    EmptyOutput,

    #[error("native call failed: {0}")]
    Native(String),
}

pub(crate) type Result<T> = std::result::Result<T, DetectError>;
