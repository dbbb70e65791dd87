use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use http::HeaderValue;

type OpenFn = dyn Fn() -> Box<dyn Read + Send> + Send + Sync;

/// Body of a request or response.
///
/// A body is cheap to clone and can be read any number of times, which is
/// needed when a request is re-sent on recovery or follow-up.
///
/// The body decides how it is framed on the wire. A body with a declared
/// length is sent with `content-length`, one without is sent with
/// `transfer-encoding: chunked`.
#[derive(Clone, Default)]
pub struct Body {
    source: Source,
    content_type: Option<HeaderValue>,
}

#[derive(Clone, Default)]
enum Source {
    #[default]
    None,
    Bytes(Arc<[u8]>),
    Reader {
        length: Option<u64>,
        open: Arc<OpenFn>,
    },
}

impl Body {
    /// No body at all.
    ///
    /// This is not the same as a zero length body, which is sent with
    /// `content-length: 0`.
    pub fn empty() -> Self {
        Body::default()
    }

    /// A body produced by a reader.
    ///
    /// `open` is invoked once for every attempt that sends the body. Without
    /// a `length` the body is sent chunked.
    pub fn from_reader<F, R>(length: Option<u64>, open: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Read + Send + 'static,
    {
        Body {
            source: Source::Reader {
                length,
                open: Arc::new(move || Box::new(open()) as Box<dyn Read + Send>),
            },
            content_type: None,
        }
    }

    /// Set the `content-type` to send along with the body.
    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// The content type of the body, if set.
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    /// Declared length of the body.
    ///
    /// `None` both for [`Body::empty()`] and for bodies without declared
    /// length. Use [`Body::is_empty()`] to tell them apart.
    pub fn content_length(&self) -> Option<u64> {
        match &self.source {
            Source::None => None,
            Source::Bytes(v) => Some(v.len() as u64),
            Source::Reader { length, .. } => *length,
        }
    }

    /// Tell if there is no body.
    pub fn is_empty(&self) -> bool {
        matches!(self.source, Source::None)
    }

    /// Tell if the body must be sent with `transfer-encoding: chunked`.
    pub fn is_chunked(&self) -> bool {
        !self.is_empty() && self.content_length().is_none()
    }

    /// The bytes of an in-memory body.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.source {
            Source::None => Some(&[] as &[u8]),
            Source::Bytes(v) => Some(&v[..]),
            Source::Reader { .. } => None,
        }
    }

    /// Open a new reader over the body contents.
    pub fn reader(&self) -> Box<dyn Read + Send> {
        match &self.source {
            Source::None => Box::new(io::empty()),
            Source::Bytes(v) => Box::new(Cursor::new(v.clone())),
            Source::Reader { open, .. } => open(),
        }
    }

    /// Read the entire body to a string.
    pub fn read_to_string(&self) -> io::Result<String> {
        let mut s = String::new();
        self.reader().read_to_string(&mut s)?;
        Ok(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body {
            source: Source::Bytes(value.into()),
            content_type: None,
        }
    }
}

impl From<&[u8]> for Body {
    fn from(value: &[u8]) -> Self {
        Body {
            source: Source::Bytes(value.into()),
            content_type: None,
        }
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        value.into_bytes().into()
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        value.as_bytes().into()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Body");
        match &self.source {
            Source::None => d.field("source", &"none"),
            Source::Bytes(v) => d.field("bytes", &v.len()),
            Source::Reader { length, .. } => d.field("reader", length),
        };
        if let Some(ct) = &self.content_type {
            d.field("content_type", ct);
        }
        d.finish()
    }
}
