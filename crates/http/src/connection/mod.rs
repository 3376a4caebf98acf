//! The connection supervisor.
//!
//! [`HttpConnection`] drives one transport connection through the
//! [`ConnectionState`] cycle: parse a request, build its environment, invoke
//! the application, frame the response, then either wait for the next
//! request or close. [`ConnectionOptions`] carries the per connection limits.

mod http_connection;
mod message_writer;

pub use http_connection::{ConnectionOptions, ConnectionState, HttpConnection};
pub use message_writer::MessageWriter;
