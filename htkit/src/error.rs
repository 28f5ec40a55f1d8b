//! Error types.

use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
    io,
    time::Duration,
};

/// Error type.
#[derive(Debug)]
pub enum Error {
    /// No credential matches the request URI.
    NoCredentials,
    /// The challenge scheme is neither `Basic` nor `Digest`.
    UnrecognizedScheme(String),
    /// The digest algorithm is not one of "", `MD5` or `MD5-sess`.
    UnhandledAlgorithm(String),
    /// The challenge grammar could not be satisfied.
    Parse {
        /// Byte offset into the header value where lexing failed.
        pos: usize,
        /// Description of the failure.
        msg: Cow<'static, str>,
    },
    /// The configured request timeout expired.
    Timeout {
        /// The request URL.
        url: String,
        /// How long the client waited.
        wait: Duration,
    },
    /// The underlying transport failed.
    Transport(Box<dyn std::error::Error + Send + Sync>),
    /// A spool reader was requested more than once.
    SpoolExhausted,
    /// IO error.
    IO(io::Error),
    /// Other error.
    Other(OtherError),
}

impl Error {
    /// Create a new error with a given message.
    pub fn from_msg<T>(msg: T) -> Self
    where
        T: Into<String>,
    {
        Self::Other(OtherError::from_msg(msg))
    }

    /// Create a new error with a given message.
    #[inline]
    pub const fn from_static_msg(msg: &'static str) -> Self {
        Self::Other(OtherError::from_static_msg(msg))
    }

    /// Create a new error with a given message and cause.
    pub fn from_msg_and_cause<T, E>(msg: T, cause: E) -> Self
    where
        T: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Other(OtherError::from_msg_and_cause(msg, cause))
    }

    /// Create a new parse error at a given byte position.
    pub fn parse<T>(pos: usize, msg: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        Self::Parse {
            pos,
            msg: msg.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<T>(url: T, wait: Duration) -> Self
    where
        T: Into<String>,
    {
        Self::Timeout {
            url: url.into(),
            wait,
        }
    }

    /// Create a new transport error from a given cause.
    pub fn transport<E>(cause: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Transport(cause.into())
    }

    /// Check if this is the no-matching-credentials error.
    #[inline]
    pub const fn is_no_credentials(&self) -> bool {
        matches!(self, Self::NoCredentials)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => f.write_str("matching login credentials not found"),
            Self::UnrecognizedScheme(scheme) => {
                write!(f, "unrecognized authorization scheme: {scheme}")
            }
            Self::UnhandledAlgorithm(algorithm) => {
                write!(f, "unhandled algorithm: {algorithm}")
            }
            Self::Parse { pos, msg } => write!(f, "error at position {pos}: {msg}"),
            Self::Timeout { url, wait } => {
                write!(
                    f,
                    "error requesting {url}: timed out after waiting {}ms",
                    wait.as_millis()
                )
            }
            Self::Transport(err) => write!(f, "transport: {err}"),
            Self::SpoolExhausted => f.write_str("the spool reader has already been taken"),
            Self::IO(err) => write!(f, "IO: {err}"),
            Self::Other(err) => Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(&**err as _),
            Self::IO(err) => Some(err as _),
            Self::Other(err) => Some(err as _),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(err: io::Error) -> Self {
        Self::IO(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::IO(err) => err,
            other => io::Error::other(other),
        }
    }
}

/// Error type representing errors without a dedicated variant.
#[derive(Debug)]
pub struct OtherError {
    msg: Cow<'static, str>,
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl OtherError {
    /// Create a new error with a given message.
    pub fn from_msg<T>(msg: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            msg: Cow::Owned(msg.into()),
            cause: None,
        }
    }

    /// Create a new error with a given message.
    #[inline]
    pub const fn from_static_msg(msg: &'static str) -> Self {
        Self {
            msg: Cow::Borrowed(msg),
            cause: None,
        }
    }

    /// Create a new error with a given message and cause.
    pub fn from_msg_and_cause<T, E>(msg: T, cause: E) -> Self
    where
        T: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            msg: Cow::Owned(msg.into()),
            cause: Some(cause.into()),
        }
    }
}

impl Display for OtherError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(cause) = &self.cause {
            if self.msg.is_empty() {
                Display::fmt(cause, f)
            } else {
                write!(f, "{}: {}", self.msg, cause)
            }
        } else if self.msg.is_empty() {
            f.write_str("unknown error")
        } else {
            f.write_str(&self.msg)
        }
    }
}

impl std::error::Error for OtherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|cause| &**cause as _)
    }
}
