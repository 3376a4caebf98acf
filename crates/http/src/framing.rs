//! The response framer's decision policy.
//!
//! [`plan_response`] takes the facts of the request that is being answered
//! and the application's [`AppResponse`], and decides how the response goes
//! on the wire:
//!
//! 1. a declared `Content-Length` is kept verbatim and the body is written as
//!    exactly that many bytes, any `Transfer-Encoding` is dropped;
//! 2. without one, an enumerable body (chunk sequence or stream) is sent with
//!    `Transfer-Encoding: chunked`;
//! 3. without one, a single opaque body gets a computed `Content-Length`;
//! 4. an empty body without a declared length is always `Content-Length: 0`,
//!    never an empty chunked stream.
//!
//! HEAD requests get the very head a GET would have produced, and no body
//! bytes. 1xx, 204 and 304 responses never carry a body, and HTTP/1.0 peers
//! never see chunked framing.

use bytes::BytesMut;
use futures::{future, stream, StreamExt, TryStreamExt};
use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode, Version};
use thiserror::Error;

use crate::protocol::{AppResponse, BodyStream, BoxError, PayloadSize, RequestHeader, ResponseBody, ResponseHead};

/// What the framer needs to know about the request being answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFacts {
    method: Method,
    version: Version,
    keep_alive: bool,
}

impl RequestFacts {
    pub fn new(method: Method, version: Version, keep_alive: bool) -> Self {
        Self { method, version, keep_alive }
    }

    pub fn from_header(header: &RequestHeader) -> Self {
        Self::new(header.method().clone(), header.version(), header.keep_alive())
    }

    /// Keep-alive is only possible when both the peer and the server allow it.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive &= keep_alive;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}

/// A response with its wire framing decided.
#[derive(Debug)]
pub struct ResponsePlan {
    head: ResponseHead,
    payload_size: PayloadSize,
    body: ResponseBody,
    keep_alive: bool,
}

impl ResponsePlan {
    /// A bodiless response with a generic status line, used for failures the
    /// client must not learn details about.
    pub fn error(status: StatusCode, keep_alive: bool) -> Self {
        let mut head = Response::new(());
        *head.status_mut() = status;
        head.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(0u64));
        if !keep_alive {
            head.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        }

        Self { head, payload_size: PayloadSize::Empty, body: ResponseBody::empty(), keep_alive }
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// The framing of the bytes that actually follow the head.
    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Whether the connection may serve another request after this response.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn into_parts(self) -> (ResponseHead, PayloadSize, ResponseBody) {
        (self.head, self.payload_size, self.body)
    }
}

/// The application's response cannot be framed; answered with a 500 instead.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("status code {0} is out of range 100..=599")]
    InvalidStatus(u16),

    #[error("invalid content-length in response: {reason}")]
    InvalidContentLength { reason: String },

    #[error("response body failed: {0}")]
    Body(BoxError),
}

/// Decides the framing of `response` as an answer to `request`.
///
/// A stream is polled here until its first non-empty chunk, so that an empty
/// stream is framed as `Content-Length: 0`. A stream answering an HTTP/1.0
/// peer is collected entirely to learn its length. Other bodies are handed
/// back untouched for the writer.
pub async fn plan_response(request: &RequestFacts, response: AppResponse) -> Result<ResponsePlan, FramingError> {
    let (mut parts, body) = response.into_parts();

    let status = parts.status.as_u16();
    if !(100..=599).contains(&status) {
        return Err(FramingError::InvalidStatus(status));
    }
    parts.version = Version::HTTP_11;

    let keep_alive = request.keep_alive && !has_close_token(&parts.headers);

    let (mut payload_size, mut body) = if is_bodiless(parts.status) {
        (PayloadSize::Empty, ResponseBody::empty())
    } else if let Some(length) = declared_length(&parts.headers)? {
        parts.headers.remove(TRANSFER_ENCODING);
        (PayloadSize::new_length(length), body)
    } else {
        frame_undeclared(&mut parts.headers, body, request.version).await?
    };

    if request.is_head() {
        payload_size = PayloadSize::Empty;
        body = ResponseBody::empty();
    }

    if !keep_alive {
        parts.headers.insert(CONNECTION, HeaderValue::from_static("close"));
    } else if request.version == Version::HTTP_10 {
        parts.headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    }

    Ok(ResponsePlan { head: Response::from_parts(parts, ()), payload_size, body, keep_alive })
}

async fn frame_undeclared(
    headers: &mut HeaderMap,
    body: ResponseBody,
    version: Version,
) -> Result<(PayloadSize, ResponseBody), FramingError> {
    let body = match body {
        ResponseBody::Chunks(chunks) => ResponseBody::Chunks(chunks.into_iter().filter(|chunk| !chunk.is_empty()).collect()),
        ResponseBody::Stream(stream) if version == Version::HTTP_10 => ResponseBody::Full(collect(stream).await?),
        ResponseBody::Stream(stream) => skip_empty_prefix(stream).await?,
        body => body,
    };

    let fixed_length = match &body {
        ResponseBody::Chunks(chunks) if chunks.is_empty() => Some(0),
        _ if !body.is_enumerable() || version == Version::HTTP_10 => body.exact_len(),
        _ => None,
    };

    if let Some(length) = fixed_length {
        headers.remove(TRANSFER_ENCODING);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        Ok((PayloadSize::new_length(length), body))
    } else {
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        Ok((PayloadSize::Chunked, body))
    }
}

async fn collect(stream: BodyStream) -> Result<bytes::Bytes, FramingError> {
    let bytes = stream
        .try_fold(BytesMut::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
        .map_err(FramingError::Body)?;
    Ok(bytes.freeze())
}

/// Polls `body` up to its first non-empty chunk. An exhausted stream becomes
/// an empty body, otherwise the chunk is put back in front of the rest.
async fn skip_empty_prefix(mut body: BodyStream) -> Result<ResponseBody, FramingError> {
    while let Some(chunk) = body.try_next().await.map_err(FramingError::Body)? {
        if !chunk.is_empty() {
            return Ok(ResponseBody::stream(stream::once(future::ready(Ok(chunk))).chain(body)));
        }
    }
    Ok(ResponseBody::empty())
}

fn is_bodiless(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

fn declared_length(headers: &HeaderMap) -> Result<Option<u64>, FramingError> {
    let mut declared = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let length = value
            .to_str()
            .ok()
            .map(str::trim)
            .filter(|str| !str.is_empty() && str.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|str| str.parse::<u64>().ok())
            .ok_or_else(|| FramingError::InvalidContentLength { reason: format!("{value:?} is not a decimal length") })?;

        match declared {
            Some(previous) if previous != length => {
                return Err(FramingError::InvalidContentLength { reason: "multiple content-length values disagree".to_string() });
            }
            _ => declared = Some(length),
        }
    }
    Ok(declared)
}

fn has_close_token(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .any(|value| value.as_bytes().split(|b| *b == b',').any(|token| token.trim_ascii().eq_ignore_ascii_case(b"close")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn get() -> RequestFacts {
        RequestFacts::new(Method::GET, Version::HTTP_11, true)
    }

    fn head() -> RequestFacts {
        RequestFacts::new(Method::HEAD, Version::HTTP_11, true)
    }

    fn hello(content_length: Option<&str>, body: ResponseBody) -> AppResponse {
        let mut builder = Response::builder().status(200).header("Content-Type", "text/plain");
        if let Some(length) = content_length {
            builder = builder.header("Content-Length", length);
        }
        builder.body(body).unwrap()
    }

    fn body_bytes(plan: &ResponsePlan) -> Vec<u8> {
        match plan.body() {
            ResponseBody::Full(bytes) => bytes.to_vec(),
            ResponseBody::Chunks(chunks) => chunks.concat(),
            ResponseBody::Stream(_) => panic!("stream body"),
        }
    }

    #[tokio::test]
    async fn declared_length_is_kept() {
        let plan = plan_response(&get(), hello(Some("11"), ResponseBody::chunks(["hello", " world"]))).await.unwrap();

        assert_eq!(plan.payload_size(), PayloadSize::Length(11));
        assert_eq!(plan.head().headers()[CONTENT_LENGTH], "11");
        assert!(plan.head().headers().get(TRANSFER_ENCODING).is_none());
        assert_eq!(body_bytes(&plan), b"hello world");
        assert!(plan.keep_alive());
    }

    #[tokio::test]
    async fn declared_length_drops_transfer_encoding() {
        let mut response = hello(Some("5"), ResponseBody::from("hello"));
        response.headers_mut().insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let plan = plan_response(&get(), response).await.unwrap();
        assert_eq!(plan.payload_size(), PayloadSize::Length(5));
        assert!(plan.head().headers().get(TRANSFER_ENCODING).is_none());
    }

    #[tokio::test]
    async fn enumerable_body_is_chunked() {
        let plan = plan_response(&get(), hello(None, ResponseBody::chunks(["hello world"]))).await.unwrap();

        assert_eq!(plan.payload_size(), PayloadSize::Chunked);
        assert_eq!(plan.head().headers()[TRANSFER_ENCODING], "chunked");
        assert!(plan.head().headers().get(CONTENT_LENGTH).is_none());
    }

    #[tokio::test]
    async fn stream_body_is_chunked() {
        let body = ResponseBody::stream(stream::iter([Ok::<_, BoxError>(Bytes::from_static(b"hello world"))]));
        let plan = plan_response(&get(), hello(None, body)).await.unwrap();

        assert_eq!(plan.payload_size(), PayloadSize::Chunked);
        assert_eq!(plan.head().headers()[TRANSFER_ENCODING], "chunked");
    }

    #[tokio::test]
    async fn stream_with_empty_prefix_is_chunked() {
        let body = ResponseBody::stream(stream::iter([
            Ok::<_, BoxError>(Bytes::new()),
            Ok(Bytes::from_static(b"hi")),
            Ok(Bytes::from_static(b" there")),
        ]));
        let plan = plan_response(&get(), hello(None, body)).await.unwrap();

        assert_eq!(plan.payload_size(), PayloadSize::Chunked);
        let (_, _, body) = plan.into_parts();
        let ResponseBody::Stream(stream) = body else { panic!("expected a stream body") };
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks, [Bytes::from_static(b"hi"), Bytes::from_static(b" there")]);
    }

    #[tokio::test]
    async fn empty_stream_is_zero_length() {
        let bodies: [fn() -> ResponseBody; 2] = [
            || ResponseBody::stream(stream::empty::<Result<Bytes, BoxError>>()),
            || ResponseBody::stream(stream::iter([Ok::<_, BoxError>(Bytes::new()), Ok(Bytes::new())])),
        ];
        for make_body in bodies {
            let plan = plan_response(&get(), hello(None, make_body())).await.unwrap();

            assert_eq!(plan.payload_size(), PayloadSize::Empty);
            assert_eq!(plan.head().headers()[CONTENT_LENGTH], "0");
            assert!(plan.head().headers().get(TRANSFER_ENCODING).is_none());
        }
    }

    #[tokio::test]
    async fn opaque_body_gets_computed_length() {
        let plan = plan_response(&get(), hello(None, ResponseBody::from("hello world"))).await.unwrap();

        assert_eq!(plan.payload_size(), PayloadSize::Length(11));
        assert_eq!(plan.head().headers()[CONTENT_LENGTH], "11");
        assert!(plan.head().headers().get(TRANSFER_ENCODING).is_none());
    }

    #[tokio::test]
    async fn empty_body_is_zero_length() {
        for body in [ResponseBody::empty(), ResponseBody::chunks(Vec::<Bytes>::new()), ResponseBody::chunks(["", ""])] {
            let plan = plan_response(&get(), hello(None, body)).await.unwrap();

            assert_eq!(plan.payload_size(), PayloadSize::Empty);
            assert_eq!(plan.head().headers()[CONTENT_LENGTH], "0");
            assert!(plan.head().headers().get(TRANSFER_ENCODING).is_none());
        }
    }

    #[tokio::test]
    async fn head_has_get_headers_and_no_body() {
        for content_length in [Some("11"), None] {
            let bodies: [fn() -> ResponseBody; 2] = [|| ResponseBody::from("hello world"), || ResponseBody::chunks(["hello", " world"])];
            for make_body in bodies {
                let get_plan = plan_response(&get(), hello(content_length, make_body())).await.unwrap();
                let head_plan = plan_response(&head(), hello(content_length, make_body())).await.unwrap();

                assert_eq!(get_plan.head().status(), head_plan.head().status());
                assert_eq!(get_plan.head().headers(), head_plan.head().headers());
                assert_eq!(head_plan.payload_size(), PayloadSize::Empty);
                assert!(body_bytes(&head_plan).is_empty());
            }
        }
    }

    #[tokio::test]
    async fn bodiless_statuses() {
        for status in [StatusCode::NO_CONTENT, StatusCode::NOT_MODIFIED, StatusCode::SWITCHING_PROTOCOLS] {
            let response = Response::builder().status(status).body(ResponseBody::from("ignored")).unwrap();
            let plan = plan_response(&get(), response).await.unwrap();

            assert_eq!(plan.payload_size(), PayloadSize::Empty);
            assert!(plan.head().headers().get(CONTENT_LENGTH).is_none());
            assert!(plan.head().headers().get(TRANSFER_ENCODING).is_none());
        }
    }

    #[tokio::test]
    async fn http10_never_chunked() {
        let request = RequestFacts::new(Method::GET, Version::HTTP_10, false);

        let plan = plan_response(&request, hello(None, ResponseBody::chunks(["hello", " world"]))).await.unwrap();
        assert_eq!(plan.payload_size(), PayloadSize::Length(11));
        assert_eq!(plan.head().headers()[CONTENT_LENGTH], "11");
        assert_eq!(plan.head().headers()[CONNECTION], "close");

        let body = ResponseBody::stream(stream::iter([
            Ok::<_, BoxError>(Bytes::from_static(b"hello")),
            Ok(Bytes::from_static(b" world")),
        ]));
        let plan = plan_response(&request, hello(None, body)).await.unwrap();
        assert_eq!(plan.payload_size(), PayloadSize::Length(11));
        assert_eq!(body_bytes(&plan), b"hello world");
    }

    #[tokio::test]
    async fn http10_keep_alive_is_announced() {
        let request = RequestFacts::new(Method::GET, Version::HTTP_10, true);
        let plan = plan_response(&request, hello(None, ResponseBody::from("ok"))).await.unwrap();

        assert!(plan.keep_alive());
        assert_eq!(plan.head().headers()[CONNECTION], "keep-alive");
        assert_eq!(plan.head().version(), Version::HTTP_11);
    }

    #[tokio::test]
    async fn connection_close() {
        let plan = plan_response(&get().with_keep_alive(false), hello(None, ResponseBody::from("ok"))).await.unwrap();
        assert!(!plan.keep_alive());
        assert_eq!(plan.head().headers()[CONNECTION], "close");

        let mut response = hello(None, ResponseBody::from("ok"));
        response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
        let plan = plan_response(&get(), response).await.unwrap();
        assert!(!plan.keep_alive());
    }

    #[tokio::test]
    async fn invalid_responses() {
        let response = hello(Some("eleven"), ResponseBody::from("hello world"));
        assert!(matches!(plan_response(&get(), response).await, Err(FramingError::InvalidContentLength { .. })));

        let response = Response::builder().status(600).body(ResponseBody::empty()).unwrap();
        assert!(matches!(plan_response(&get(), response).await, Err(FramingError::InvalidStatus(600))));

        let body = ResponseBody::stream(stream::iter([Err::<Bytes, BoxError>("boom".into())]));
        let request = RequestFacts::new(Method::GET, Version::HTTP_10, false);
        assert!(matches!(plan_response(&request, hello(None, body)).await, Err(FramingError::Body(_))));
    }

    #[test]
    fn error_plan() {
        let plan = ResponsePlan::error(StatusCode::BAD_REQUEST, false);

        assert_eq!(plan.head().status(), StatusCode::BAD_REQUEST);
        assert_eq!(plan.head().headers()[CONTENT_LENGTH], "0");
        assert_eq!(plan.head().headers()[CONNECTION], "close");
        assert!(!plan.keep_alive());
        assert!(plan.payload_size().is_empty());
    }
}
