//! The response side of the application contract.
//!
//! An application answers with an [`AppResponse`]: an `http::Response`
//! whose body is a [`ResponseBody`]. The body variant is the explicit tag
//! the response framer uses to choose between fixed-length and chunked
//! transfer, so the writer never has to inspect the body at write time.

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use http::Response;

use crate::protocol::BoxError;

/// Status line and headers of a response, before a body is attached.
///
/// Header values go on the wire unchanged, but header names are written in
/// lowercase: `http::HeaderName` does not keep the case it was built with.
pub type ResponseHead = Response<()>;

/// What an application returns: status, headers and a tagged body.
///
/// Header names reach the wire lowercased, see [`ResponseHead`].
pub type AppResponse = Response<ResponseBody>;

/// A body produced incrementally, possibly suspending between chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send + 'static>>;

/// The body of an [`AppResponse`].
pub enum ResponseBody {
    /// One opaque, pre-sized byte string.
    Full(Bytes),
    /// A finite ordered sequence of chunks.
    Chunks(Vec<Bytes>),
    /// A sequence of chunks produced asynchronously.
    Stream(BodyStream),
}

impl ResponseBody {
    pub fn empty() -> Self {
        ResponseBody::Full(Bytes::new())
    }

    pub fn full(bytes: impl Into<Bytes>) -> Self {
        ResponseBody::Full(bytes.into())
    }

    pub fn chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        ResponseBody::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        ResponseBody::Stream(Box::pin(stream))
    }

    /// Whether the body is a sequence of chunks rather than one opaque value.
    pub fn is_enumerable(&self) -> bool {
        !matches!(self, ResponseBody::Full(_))
    }

    /// The exact byte length, when it is known without polling anything.
    pub fn exact_len(&self) -> Option<u64> {
        match self {
            ResponseBody::Full(bytes) => Some(bytes.len() as u64),
            ResponseBody::Chunks(chunks) => Some(chunks.iter().map(|chunk| chunk.len() as u64).sum()),
            ResponseBody::Stream(_) => None,
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Full(bytes) => f.debug_tuple("Full").field(bytes).finish(),
            ResponseBody::Chunks(chunks) => f.debug_tuple("Chunks").field(chunks).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        ResponseBody::Full(bytes)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(str: &'static str) -> Self {
        ResponseBody::Full(Bytes::from_static(str.as_bytes()))
    }
}

impl From<&'static [u8]> for ResponseBody {
    fn from(slice: &'static [u8]) -> Self {
        ResponseBody::Full(Bytes::from_static(slice))
    }
}

impl From<String> for ResponseBody {
    fn from(string: String) -> Self {
        ResponseBody::Full(Bytes::from(string))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(vec: Vec<u8>) -> Self {
        ResponseBody::Full(Bytes::from(vec))
    }
}

impl From<Vec<Bytes>> for ResponseBody {
    fn from(chunks: Vec<Bytes>) -> Self {
        ResponseBody::Chunks(chunks)
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        ResponseBody::empty()
    }
}
