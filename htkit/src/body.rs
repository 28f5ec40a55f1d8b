//! Message body.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

/// Message body.
///
/// The body is a stream of byte chunks. A body backed by a stream can be
/// read only once.
pub struct Body {
    inner: BodyVariant,
    size: Option<usize>,
}

impl Body {
    /// Create a new body from a given byte stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: BodyVariant::Stream(Box::pin(stream)),
            size: None,
        }
    }

    /// Create an empty body.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            inner: BodyVariant::Empty,
            size: Some(0),
        }
    }

    /// Get the body size (if known).
    #[inline]
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Read the whole body into a single buffer.
    pub async fn read(self) -> io::Result<Bytes> {
        let mut stream = match self.inner {
            BodyVariant::Empty => return Ok(Bytes::new()),
            BodyVariant::Bytes(data) => return Ok(data),
            BodyVariant::Stream(stream) => stream,
        };

        let mut body = BytesMut::new();

        while let Some(chunk) = stream.next().await.transpose()? {
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body").field("size", &self.size).finish()
    }
}

impl Default for Body {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&'static [u8]> for Body {
    #[inline]
    fn from(s: &'static [u8]) -> Self {
        Self::from(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    #[inline]
    fn from(s: &'static str) -> Self {
        Self::from(Bytes::from(s))
    }
}

impl From<Bytes> for Body {
    #[inline]
    fn from(data: Bytes) -> Self {
        let size = Some(data.len());

        Self {
            inner: BodyVariant::Bytes(data),
            size,
        }
    }
}

impl From<BytesMut> for Body {
    #[inline]
    fn from(bytes: BytesMut) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<Vec<u8>> for Body {
    #[inline]
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    #[inline]
    fn from(s: String) -> Self {
        Self::from(Bytes::from(s))
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Internal representation of the body.
enum BodyVariant {
    Empty,
    Bytes(Bytes),
    Stream(Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>),
}

impl Stream for BodyVariant {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut *self {
            Self::Empty => Poll::Ready(None),
            Self::Bytes(_) => {
                if let Self::Bytes(data) = std::mem::replace(&mut *self, Self::Empty) {
                    Poll::Ready(Some(Ok(data)))
                } else {
                    Poll::Ready(None)
                }
            }
            Self::Stream(stream) => stream.poll_next_unpin(cx),
        }
    }
}
