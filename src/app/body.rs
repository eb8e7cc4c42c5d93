//! Response bodies produced by applications.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};

use crate::app::error::AppError;

/// Lazily produced body chunks.
pub type ChunkStream = BoxStream<'static, Result<Bytes, AppError>>;

/// Release capability attached to a body (file handles, pooled connections, ...).
///
/// Consumes itself, so a disposer can run at most once.
pub trait Close: Send {
    fn close(self: Box<Self>);
}

impl<F> Close for F
where
    F: FnOnce() + Send,
{
    fn close(self: Box<Self>) {
        (*self)()
    }
}

/// A single-use chunk stream with an optional disposer.
pub struct AppBody {
    chunks: ChunkStream,
    closer: Option<Box<dyn Close>>,
}

impl AppBody {
    pub fn new<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes, AppError>> + Send + 'static,
    {
        Self {
            chunks: chunks.boxed(),
            closer: None,
        }
    }

    /// Body yielding the given chunks, in order, then ending.
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Bytes> = chunks.into_iter().map(Into::into).collect();
        Self::new(stream::iter(chunks.into_iter().map(Ok)))
    }

    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    /// Attach a disposer that must run once the body is no longer consumed.
    pub fn with_close<C: Close + 'static>(mut self, closer: C) -> Self {
        self.closer = Some(Box::new(closer));
        self
    }

    pub fn has_close(&self) -> bool {
        self.closer.is_some()
    }

    /// Run the disposer if there is one. Later calls do nothing.
    pub fn close(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer.close();
        }
    }
}

impl Stream for AppBody {
    type Item = Result<Bytes, AppError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl fmt::Debug for AppBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBody")
            .field("has_close", &self.has_close())
            .finish()
    }
}
