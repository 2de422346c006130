//! Unified error type.

/// The error type returned by reqlog's fallible operations.
///
/// Logging itself never fails a request. This type surfaces setup mistakes
/// (a malformed exclusion URL, an unparsable bind address) and infrastructure
/// failures: binding to a port or accepting a connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// [`RequestLogger::exclude_url`](crate::RequestLogger::exclude_url) was
    /// given a string that does not parse as a URL.
    #[error("malformed url `{url}`: {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: UrlError,
    },

    #[error("invalid socket address `{0}`")]
    InvalidAddr(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an exclusion URL was rejected.
#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("missing protocol scheme")]
    MissingScheme,

    #[error("first path segment in URL cannot contain colon")]
    ColonInFirstSegment,

    #[error("invalid URL escape `{0}`")]
    InvalidEscape(String),

    #[error("invalid control character {0:?} in URL")]
    ControlCharacter(char),

    #[error("leading or trailing whitespace in URL")]
    SurroundingWhitespace,
}
