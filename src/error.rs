use std::fmt;
use std::io;

/// Error type for ureq-call
///
/// Every variant belongs to one [`ErrorKind`], which decides how the call
/// execution treats it. Transport implementations report their failures using
/// the [`Error::Connect`] and [`Error::Io`] variants to make them eligible for
/// recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Error {
    AlreadyExecuted,
    InterceptorNoResponse(String),
    NoResponse,
    BadHeader(String),
    BadRequest(String),
    Connect(io::ErrorKind, String),
    Io(io::ErrorKind, String),
    Canceled,
    TooManyFollowUps(u32),
    NoLocationHeader,
    BadLocationHeader(String),
}

/// Classification of an [`Error`].
///
/// The retry/follow-up loop branches on this rather than on the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Misuse of the API, such as executing a call twice or an interceptor
    /// not producing a response. Never retried.
    State,

    /// The request could not be interpreted for transport. Never retried.
    RequestMalformed,

    /// Connecting via a route failed before any bytes were exchanged.
    ///
    /// Retried if the transport can recover.
    Connect,

    /// Talking to the server failed after a connection was established.
    ///
    /// Retried if the transport can recover. The server may have received,
    /// and even acted upon, the request.
    Communication,

    /// The call was canceled.
    Canceled,

    /// The server's response could not be followed up, or there were too
    /// many follow-ups.
    Protocol,
}

impl Error {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyExecuted | Error::InterceptorNoResponse(_) | Error::NoResponse => {
                ErrorKind::State
            }
            Error::BadHeader(_) | Error::BadRequest(_) => ErrorKind::RequestMalformed,
            Error::Connect(_, _) => ErrorKind::Connect,
            Error::Io(_, _) => ErrorKind::Communication,
            Error::Canceled => ErrorKind::Canceled,
            Error::TooManyFollowUps(_) | Error::NoLocationHeader | Error::BadLocationHeader(_) => {
                ErrorKind::Protocol
            }
        }
    }

    /// Tell if a transport could possibly recover from this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connect | ErrorKind::Communication)
    }

    /// Create an error for a failed connection attempt.
    pub fn connect(e: &io::Error) -> Self {
        Error::Connect(e.kind(), e.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value.kind(), value.to_string())
    }
}

impl From<http::Error> for Error {
    fn from(value: http::Error) -> Self {
        Error::BadHeader(value.to_string())
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        let kind = match &value {
            Error::Connect(k, _) | Error::Io(k, _) => *k,
            Error::Canceled => io::ErrorKind::Interrupted,
            Error::BadHeader(_) | Error::BadRequest(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, value)
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AlreadyExecuted => write!(f, "already executed"),
            Error::InterceptorNoResponse(v) => write!(f, "interceptor {} returned no response", v),
            Error::NoResponse => write!(f, "exchange finished without a response"),
            Error::BadHeader(v) => write!(f, "bad header: {}", v),
            Error::BadRequest(v) => write!(f, "bad request: {}", v),
            Error::Connect(_, v) => write!(f, "connect failed: {}", v),
            Error::Io(_, v) => write!(f, "io: {}", v),
            Error::Canceled => write!(f, "canceled"),
            Error::TooManyFollowUps(v) => write!(f, "too many follow-up requests: {}", v),
            Error::NoLocationHeader => write!(f, "missing a location header"),
            Error::BadLocationHeader(v) => write!(f, "location header is malformed: {}", v),
        }
    }
}
