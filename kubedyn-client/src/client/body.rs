use std::{
    fmt,
    pin::Pin,
    task::{ready, Context, Poll},
};

use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::{combinators::UnsyncBoxBody, BodyExt};
use tower::BoxError;

/// Body of the requests the client sends and the responses it hands back.
///
/// Requests are always fully serialized before they are sent, so they carry a single buffer.
/// Responses wrap whatever body the underlying service produced, which is what lets a watch
/// be decoded while the server is still sending it.
pub struct Body(Inner);

enum Inner {
    Buffered(Option<Bytes>),
    Streaming(UnsyncBoxBody<Bytes, BoxError>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Inner::Buffered(bytes) => f
                .debug_tuple("Body::Buffered")
                .field(&bytes.as_ref().map_or(0, Bytes::len))
                .finish(),
            Inner::Streaming(_) => f.write_str("Body::Streaming"),
        }
    }
}

impl Body {
    /// A body without content
    pub fn empty() -> Self {
        Body(Inner::Buffered(None))
    }

    pub(crate) fn wrap_body<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Body(Inner::Streaming(body.map_err(Into::into).boxed_unsync()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(buf: Vec<u8>) -> Self {
        if buf.is_empty() {
            Self::empty()
        } else {
            Body(Inner::Buffered(Some(Bytes::from(buf))))
        }
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = crate::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, crate::Error>>> {
        match &mut self.0 {
            Inner::Buffered(buf) => Poll::Ready(buf.take().map(|data| Ok(Frame::data(data)))),
            Inner::Streaming(body) => {
                let frame = ready!(Pin::new(body).poll_frame(cx));
                Poll::Ready(frame.map(|res| res.map_err(crate::Error::Service)))
            }
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.0 {
            Inner::Buffered(buf) => SizeHint::with_exact(buf.as_ref().map_or(0, Bytes::len) as u64),
            Inner::Streaming(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.0 {
            Inner::Buffered(buf) => buf.is_none(),
            Inner::Streaming(body) => body.is_end_stream(),
        }
    }
}
