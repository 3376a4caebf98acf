use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::application::{Application, invoke};
use crate::codec::RequestDecoder;
use crate::connection::message_writer::MessageWriter;
use crate::framing::{RequestFacts, ResponsePlan, plan_response};
use crate::protocol::{
    ConnectionInfo, Environment, HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseBody,
    ResponseHead, SendError,
};

const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;
const DEFAULT_MAX_BODY_SIZE: u64 = 8 * 1024 * 1024;
const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(75);

type RequestMessage = Message<(RequestHeader, PayloadSize)>;

/// Per connection limits and keep-alive policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    keep_alive: bool,
    keep_alive_timeout: Option<Duration>,
    max_body_size: u64,
    read_buffer_size: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            keep_alive: true,
            keep_alive_timeout: Some(DEFAULT_KEEP_ALIVE_TIMEOUT),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl ConnectionOptions {
    /// When `false`, every response closes the connection.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// How long an idle connection waits for its next request; `None` waits forever.
    #[must_use]
    pub fn with_keep_alive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    #[must_use]
    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn keep_alive_timeout(&self) -> Option<Duration> {
        self.keep_alive_timeout
    }

    pub fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }
}

/// Where a connection is in its request/response cycle.
///
/// ```text
/// Idle -> Reading -> Dispatching -> Writing -> Idle
///   \________\___________\____________\______-> Closing
/// ```
///
/// `Reading -> Writing` is taken when a malformed request is answered
/// with an error status right before closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Reading,
    Dispatching,
    Writing,
    Closing,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::{Closing, Dispatching, Idle, Reading, Writing};

        matches!(
            (self, next),
            (Idle, Reading) | (Reading, Dispatching | Writing) | (Dispatching, Writing) | (Writing, Idle) | (Idle | Reading | Dispatching | Writing, Closing)
        )
    }
}

/// The supervisor of one transport connection.
///
/// `HttpConnection` owns both halves of the transport and runs the
/// request/response cycle on it: read one request, hand it to the
/// application, write the framed response, and either go back to reading or
/// close. Requests on one connection are never processed concurrently, so a
/// response is always completely written before the next request is read.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: MessageWriter<W>,
    info: ConnectionInfo,
    options: ConnectionOptions,
    state: ConnectionState,
}

impl<R, W> std::fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").field("info", &self.info).field("options", &self.options).field("state", &self.state).finish_non_exhaustive()
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_options(reader, writer, ConnectionInfo::default(), ConnectionOptions::default())
    }

    pub fn with_options(reader: R, writer: W, info: ConnectionInfo, options: ConnectionOptions) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), options.read_buffer_size),
            writer: MessageWriter::with_capacity(writer, options.read_buffer_size),
            info,
            options,
            state: ConnectionState::Idle,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serves requests until the peer hangs up, a response closes the
    /// connection, the idle timeout elapses, or `shutdown` is cancelled.
    ///
    /// A clean close is `Ok`. A malformed request is answered with its error
    /// status and returned as `Err`, as is any failure to write a response.
    pub async fn process<A>(mut self, app: Arc<A>, shutdown: CancellationToken) -> Result<(), HttpError>
    where
        A: Application,
    {
        let result = self.serve(&*app, &shutdown).await;

        self.transition(ConnectionState::Closing);
        if let Err(e) = self.writer.shutdown().await {
            trace!(cause = %e, "can't shutdown connection writer");
        }

        result
    }

    async fn serve<A>(&mut self, app: &A, shutdown: &CancellationToken) -> Result<(), HttpError>
    where
        A: Application,
    {
        loop {
            let Some(message) = self.next_request(shutdown).await else {
                return Ok(());
            };
            self.transition(ConnectionState::Reading);

            let (header, payload_size) = match message {
                Ok(Message::Header(header)) => header,
                Ok(Message::Payload(_)) => return self.reject(ParseError::invalid_body("receive body while expecting request header")).await,
                Err(e) => return self.reject(e).await,
            };

            let body = match self.read_body(&header, payload_size).await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    debug!("peer closed the connection in the middle of a request body");
                    return Ok(());
                }
                Err(HttpError::RequestError { source }) => return self.reject(source).await,
                Err(e) => return Err(e),
            };

            let request = RequestFacts::from_header(&header);

            self.transition(ConnectionState::Dispatching);
            let env = Environment::build(header, body, &self.info);
            let response = invoke(app, env).await;

            // shutdown may have fired while the application was running
            let request = request.with_keep_alive(self.options.keep_alive && !shutdown.is_cancelled());

            let plan = match plan_response(&request, response).await {
                Ok(plan) => plan,
                Err(e) => {
                    error!(cause = %e, "can't frame application response");
                    ResponsePlan::error(StatusCode::INTERNAL_SERVER_ERROR, request.keep_alive())
                }
            };

            self.transition(ConnectionState::Writing);
            let keep_alive = plan.keep_alive();
            self.send(plan).await?;

            if !keep_alive || shutdown.is_cancelled() {
                debug!(keep_alive, "response finished, closing connection");
                return Ok(());
            }
            self.transition(ConnectionState::Idle);
        }
    }

    /// Waits for the next request head while idle.
    async fn next_request(&mut self, shutdown: &CancellationToken) -> Option<Result<RequestMessage, ParseError>> {
        let idle_timeout = self.options.keep_alive_timeout;
        let idle = async move {
            match idle_timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        select! {
            biased;

            () = shutdown.cancelled() => {
                debug!("server is shutting down, closing idle connection");
                None
            }

            message = self.framed_read.next() => {
                if message.is_none() {
                    debug!("peer closed the connection");
                }
                message
            }

            () = idle => {
                debug!(timeout = ?idle_timeout, "keep-alive timeout elapsed, closing idle connection");
                None
            }
        }
    }

    /// Buffers the request body. `None` means the peer hung up before its end.
    async fn read_body(&mut self, header: &RequestHeader, payload_size: PayloadSize) -> Result<Option<Bytes>, HttpError> {
        let max_body_size = self.options.max_body_size;
        if let PayloadSize::Length(length) = payload_size {
            if length > max_body_size {
                return Err(ParseError::too_large_body(length, max_body_size).into());
            }
        }

        if header.expects_continue() && !payload_size.is_empty() {
            self.writer.write_continue().await?;
            trace!("receive expect request header, sent continue response");
        }

        let mut body = BytesMut::new();
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(chunk)))) => {
                    let size = (body.len() + chunk.len()) as u64;
                    if size > max_body_size {
                        return Err(ParseError::too_large_body(size, max_body_size).into());
                    }
                    body.extend_from_slice(&chunk);
                }
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(Some(body.freeze())),
                Some(Ok(Message::Header(_))) => {
                    return Err(ParseError::invalid_body("receive request header while reading body").into());
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }

    /// Answers a malformed request with its error status, then gives up on
    /// the connection: the stream position can't be trusted any more.
    ///
    /// A transport failure gets no answer.
    async fn reject(&mut self, e: ParseError) -> Result<(), HttpError> {
        let Some(status) = e.status_code() else {
            debug!(cause = %e, "can't read request, closing connection");
            return Err(e.into());
        };
        warn!(cause = %e, "malformed request, closing connection");

        self.transition(ConnectionState::Writing);
        if let Err(send_error) = self.send(ResponsePlan::error(status, false)).await {
            debug!(cause = %send_error, "can't send error response");
        }

        Err(e.into())
    }

    async fn send(&mut self, plan: ResponsePlan) -> Result<(), HttpError> {
        let (head, payload_size, body) = plan.into_parts();
        self.writer.write(Message::<_, Bytes>::Header((head, payload_size)))?;

        if !payload_size.is_empty() {
            match body {
                ResponseBody::Full(bytes) => self.writer.write(payload(bytes))?,
                ResponseBody::Chunks(chunks) => {
                    for chunk in chunks {
                        self.writer.send(payload(chunk)).await?;
                    }
                }
                ResponseBody::Stream(mut stream) => {
                    while let Some(chunk) = stream.next().await {
                        let chunk = chunk.map_err(|e| SendError::invalid_body(format!("response body stream failed: {e}")))?;
                        self.writer.send(payload(chunk)).await?;
                    }
                }
            }
        }

        self.writer.write(Message::<(ResponseHead, PayloadSize), Bytes>::Payload(PayloadItem::Eof))?;
        self.writer.flush().await?;
        Ok(())
    }

    fn transition(&mut self, next: ConnectionState) {
        debug_assert!(self.state.can_transition_to(next), "invalid connection state transition {:?} -> {next:?}", self.state);
        trace!(from = ?self.state, to = ?next, "connection state");
        self.state = next;
    }
}

fn payload(bytes: Bytes) -> Message<(ResponseHead, PayloadSize)> {
    Message::Payload(PayloadItem::Chunk(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::make_application;
    use crate::protocol::{AppResponse, BoxError};
    use futures::stream;
    use http::Response;
    use indoc::indoc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
    use tokio::task::JoinHandle;

    type TestConnection = HttpConnection<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn crlf(str: &str) -> String {
        str.replace('\n', "\r\n")
    }

    fn hello(content_length: bool) -> impl Application {
        make_application(move |_env: Environment| async move {
            let mut builder = Response::builder().status(200).header("Content-Type", "text/plain");
            let body = if content_length {
                builder = builder.header("Content-Length", "11");
                ResponseBody::from("hello world")
            } else {
                ResponseBody::chunks(["hello world"])
            };
            Ok::<_, BoxError>(builder.body(body)?)
        })
    }

    fn echo() -> impl Application {
        make_application(|env: Environment| async move {
            let body = format!("{} {} {}", env.method(), env.path(), String::from_utf8_lossy(env.body()));
            Ok::<AppResponse, BoxError>(Response::new(body.into()))
        })
    }

    fn connect(options: ConnectionOptions) -> (DuplexStream, TestConnection) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(server);
        (client, HttpConnection::with_options(reader, writer, ConnectionInfo::default(), options))
    }

    fn spawn<A: Application + 'static>(
        connection: TestConnection,
        app: A,
        shutdown: CancellationToken,
    ) -> JoinHandle<Result<(), HttpError>> {
        tokio::spawn(connection.process(Arc::new(app), shutdown))
    }

    /// Sends `request`, half-closes, and reads until the server closes.
    async fn exchange<A: Application + 'static>(app: A, request: &str) -> (String, Result<(), HttpError>) {
        let (mut client, connection) = connect(ConnectionOptions::default());
        let task = spawn(connection, app, CancellationToken::new());

        client.write_all(crlf(request).as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        (String::from_utf8(response).unwrap(), task.await.unwrap())
    }

    #[tokio::test]
    async fn get_with_content_length() {
        let (response, result) = exchange(hello(true), "GET / HTTP/1.1\nHost: localhost\n\n").await;

        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 200 OK
            content-type: text/plain
            content-length: 11

            hello world"}));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn head_has_no_body() {
        let (response, result) = exchange(hello(true), "HEAD / HTTP/1.1\nHost: localhost\n\n").await;

        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 200 OK
            content-type: text/plain
            content-length: 11

            "}));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn chunked_without_content_length() {
        let (response, _) = exchange(hello(false), "GET / HTTP/1.1\nHost: localhost\n\n").await;

        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 200 OK
            content-type: text/plain
            transfer-encoding: chunked

            B
            hello world
            0

            "}));
    }

    #[tokio::test]
    async fn keep_alive_serves_requests_in_order() {
        let request = indoc! {"
            POST /first HTTP/1.1
            Content-Length: 4

            testGET /second HTTP/1.1
            Content-Length: 4

            test
            "};
        let (response, result) = exchange(echo(), request.trim_end()).await;

        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 200 OK
            content-length: 16

            POST /first testHTTP/1.1 200 OK
            content-length: 16

            GET /second test"}));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn chunked_request_body() {
        let request = indoc! {"
            PUT /upload HTTP/1.1
            Transfer-Encoding: chunked

            5
            hello
            6
             world
            0

            "};
        let (response, _) = exchange(echo(), request).await;

        assert!(response.ends_with("\r\n\r\nPUT /upload hello world"), "{response}");
    }

    #[tokio::test]
    async fn malformed_request_is_rejected() {
        let (response, result) = exchange(echo(), "GET / HTTP/1.1\nbad header\n\n").await;

        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 400 Bad Request
            content-length: 0
            connection: close

            "}));
        assert!(matches!(result, Err(HttpError::RequestError { .. })));
    }

    #[tokio::test]
    async fn peer_closing_mid_request_is_clean() {
        for request in ["GET / HTTP/1.1\nHost: loc", "POST / HTTP/1.1\nContent-Length: 10\n\nabc"] {
            let (response, result) = exchange(echo(), request).await;

            assert_eq!(response, "", "{request:?}");
            assert!(result.is_ok(), "{request:?}: {result:?}");
        }
    }

    #[tokio::test]
    async fn peer_closing_after_complete_request_gets_response() {
        let (response, result) = exchange(echo(), "GET /a HTTP/1.1\n\nGET /b HTTP/1.1\nHo").await;

        assert!(response.ends_with("GET /a "), "{response}");
        assert_eq!(response.matches("HTTP/1.1").count(), 1);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn empty_stream_is_zero_length() {
        let app = make_application(|_env: Environment| async move {
            Ok::<_, BoxError>(Response::new(ResponseBody::stream(stream::empty::<Result<Bytes, BoxError>>())))
        });
        let (response, result) = exchange(app, "GET / HTTP/1.1\n\n").await;

        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 200 OK
            content-length: 0

            "}));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn multi_chunk_body_on_the_wire() {
        let app = make_application(|_env: Environment| async move {
            let body = ResponseBody::chunks(["a".repeat(20), String::new(), "b".repeat(300), "c".to_string()]);
            Ok::<_, BoxError>(Response::new(body))
        });
        let (response, result) = exchange(app, "GET / HTTP/1.1\n\n").await;

        let expected = format!("14\r\n{}\r\n12C\r\n{}\r\n1\r\nc\r\n0\r\n\r\n", "a".repeat(20), "b".repeat(300));
        assert!(response.starts_with("HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n"), "{response}");
        assert!(response.ends_with(&expected), "{response}");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_during_dispatch_announces_close() {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let app = make_application(move |_env: Environment| {
            let token = token.clone();
            async move {
                token.cancel();
                Ok::<_, BoxError>(Response::new(ResponseBody::from("bye")))
            }
        });

        let (mut client, connection) = connect(ConnectionOptions::default());
        let task = spawn(connection, app, shutdown);
        client.write_all(b"GET / HTTP/1.1\r\n\r\nGET / HTTP/1.1\r\n\r\n").await.unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 200 OK
            content-length: 3
            connection: close

            bye"}));
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn http10_closes_after_response() {
        let (mut client, connection) = connect(ConnectionOptions::default());
        let task = spawn(connection, echo(), CancellationToken::new());

        client.write_all(b"GET /old HTTP/1.0\r\n\r\n").await.unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 200 OK
            content-length: 9
            connection: close

            GET /old "}));
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn application_failure_keeps_connection() {
        let app = make_application(|env: Environment| async move {
            if env.path() == "/fail" {
                return Err::<AppResponse, BoxError>("boom".into());
            }
            if env.path() == "/panic" {
                panic!("boom");
            }
            Ok(Response::new(ResponseBody::from("ok")))
        });
        let request = "GET /fail HTTP/1.1\n\nGET /panic HTTP/1.1\n\nGET /ok HTTP/1.1\n\n";
        let (response, result) = exchange(app, request).await;

        assert_eq!(response, crlf(indoc! {"
            HTTP/1.1 500 Internal Server Error
            content-length: 0

            HTTP/1.1 500 Internal Server Error
            content-length: 0

            HTTP/1.1 200 OK
            content-length: 2

            ok"}));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn stream_failure_closes_connection() {
        let app = make_application(|_env: Environment| async move {
            let body = stream::iter([Ok(Bytes::from_static(b"hello")), Err::<Bytes, BoxError>("broken".into())]);
            Ok::<_, BoxError>(Response::new(ResponseBody::stream(body)))
        });
        let (response, result) = exchange(app, "GET / HTTP/1.1\n\nGET / HTTP/1.1\n\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n"), "{response}");
        assert!(!response.ends_with("0\r\n\r\n"));
        assert_eq!(response.matches("HTTP/1.1").count(), 1);
        assert!(matches!(result, Err(HttpError::ResponseError { .. })));
    }

    #[tokio::test]
    async fn expect_continue() {
        let (mut client, connection) = connect(ConnectionOptions::default());
        let task = spawn(connection, echo(), CancellationToken::new());

        client.write_all(b"POST /upload HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 5\r\n\r\n").await.unwrap();

        let mut interim = [0u8; 25];
        client.read_exact(&mut interim).await.unwrap();
        assert_eq!(&interim, b"HTTP/1.1 100 Continue\r\n\r\n");

        client.write_all(b"hello").await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.ends_with("POST /upload hello"), "{response}");
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn body_too_large() {
        let (mut client, connection) = connect(ConnectionOptions::default().with_max_body_size(4));
        let task = spawn(connection, echo(), CancellationToken::new());

        client.write_all(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello").await.unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"), "{response}");
        assert!(matches!(task.await.unwrap(), Err(HttpError::RequestError { source: ParseError::TooLargeBody { .. } })));
    }

    #[tokio::test]
    async fn keep_alive_disabled() {
        let (mut client, connection) = connect(ConnectionOptions::default().with_keep_alive(false));
        let task = spawn(connection, echo(), CancellationToken::new());

        client.write_all(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n").await.unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        assert!(response.contains("connection: close\r\n"));
        assert!(response.ends_with("GET /a "));
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn idle_connection_times_out() {
        let options = ConnectionOptions::default().with_keep_alive_timeout(Some(Duration::from_millis(20)));
        let (mut client, connection) = connect(options);
        let task = spawn(connection, echo(), CancellationToken::new());

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn shutdown_closes_idle_connection() {
        let (mut client, connection) = connect(ConnectionOptions::default().with_keep_alive_timeout(None));
        let shutdown = CancellationToken::new();
        let task = spawn(connection, echo(), shutdown.clone());

        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        let mut head = [0u8; 17];
        client.read_exact(&mut head).await.unwrap();
        assert_eq!(&head, b"HTTP/1.1 200 OK\r\n");

        shutdown.cancel();
        assert!(task.await.unwrap().is_ok());
    }

    #[test]
    fn state_transitions() {
        use ConnectionState::{Closing, Dispatching, Idle, Reading, Writing};

        assert!(Idle.can_transition_to(Reading));
        assert!(Reading.can_transition_to(Dispatching));
        assert!(Dispatching.can_transition_to(Writing));
        assert!(Writing.can_transition_to(Idle));
        assert!(Reading.can_transition_to(Writing));
        for state in [Idle, Reading, Dispatching, Writing] {
            assert!(state.can_transition_to(Closing));
        }

        assert!(!Idle.can_transition_to(Writing));
        assert!(!Dispatching.can_transition_to(Idle));
        assert!(!Closing.can_transition_to(Idle));
    }
}
