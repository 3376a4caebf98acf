//! An asynchronous HTTP/1.1 connection adapter for request/response
//! applications.
//!
//! The crate sits between a TCP listener and an application that maps a
//! normalized request [`Environment`](protocol::Environment) to a response.
//! It parses requests off the wire, builds the environment, calls the
//! application, and frames whatever comes back: fixed-length, chunked, or
//! no body at all for `HEAD` and bodiless statuses.
//!
//! # Example
//!
//! ```no_run
//! use http::{Response, StatusCode};
//! use micro_rack::application::make_application;
//! use micro_rack::protocol::{AppResponse, BoxError, Environment, ResponseBody};
//! use micro_rack::server::{Server, ServerConfig};
//! use tracing::{Level, info};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber)?;
//!
//!     let server = Server::start(ServerConfig::new("127.0.0.1", 9292), make_application(hello_world)).await?;
//!     info!(addr = %server.local_addr(), "serving");
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.terminate().await;
//!     Ok(())
//! }
//!
//! async fn hello_world(env: Environment) -> Result<AppResponse, BoxError> {
//!     info!(path = env.path(), "receive request");
//!
//!     // no content-length: the chunk sequence is sent chunked
//!     let response = Response::builder()
//!         .status(StatusCode::OK)
//!         .header(http::header::CONTENT_TYPE, "text/plain")
//!         .body(ResponseBody::chunks(["hello", " world"]))?;
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: request head, response body variants, environment and errors
//! - [`codec`]: `tokio_util` decoders and encoders for the HTTP/1.1 wire format
//! - [`framing`]: decides how a response goes on the wire
//! - [`application`]: the application contract and the failure isolating invoker
//! - [`connection`]: the per connection request/response cycle
//! - [`server`]: listener, accept loop and graceful shutdown
//!
//! # Error Handling
//!
//! - [`protocol::ParseError`]: malformed requests, answered with a 4xx/5xx status before closing
//! - [`protocol::SendError`]: responses that could not be delivered
//! - [`protocol::HttpError`]: either of the above, ends one connection only
//! - [`server::ServerError`]: the server could not bind its address
//!
//! Application errors and panics never leave [`application::invoke`]; they
//! become an empty `500 Internal Server Error`.
//!
//! # Limitations
//!
//! - HTTP/1.1 and HTTP/1.0 only, no TLS
//! - Request bodies are buffered in memory up to a configured limit
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod application;
pub mod codec;
pub mod connection;
pub mod framing;
pub mod protocol;
pub mod server;

mod utils;
pub(crate) use utils::ensure;
