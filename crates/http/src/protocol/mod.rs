//! Protocol types shared by the codec, the connection and applications.
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: the units the codecs
//!   produce and consume
//! - [`RequestHeader`]: a parsed request line and header block
//! - [`Environment`]: what the application receives
//! - [`AppResponse`], [`ResponseBody`]: what the application returns
//! - [`HttpError`], [`ParseError`], [`SendError`]: connection level errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::AppResponse;
pub use response::BodyStream;
pub use response::ResponseBody;
pub use response::ResponseHead;

mod environment;
pub use environment::ConnectionInfo;
pub use environment::Environment;

mod error;
pub use error::BoxError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
