//! The application contract and its invoker.
//!
//! An [`Application`] is the single extension point of the server: it is
//! called exactly once per request with the request's [`Environment`] and
//! answers with an [`AppResponse`]. One instance is shared by every
//! connection, so it must be callable concurrently.
//!
//! [`invoke`] is the only way the connection calls into an application. It
//! converts an error or a panic into a bare `500 Internal Server Error`, so a
//! misbehaving application never takes a connection or the server down with
//! it, and no failure detail reaches the client.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use http::{Response, StatusCode};
use tracing::error;

use crate::protocol::{AppResponse, BoxError, Environment, ResponseBody};

#[async_trait]
pub trait Application: Send + Sync {
    type Error: Into<BoxError>;

    async fn call(&self, env: Environment) -> Result<AppResponse, Self::Error>;
}

/// An [`Application`] backed by an async function, see [`make_application`].
#[derive(Debug)]
pub struct ApplicationFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Err> Application for ApplicationFn<F>
where
    F: Fn(Environment) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AppResponse, Err>> + Send,
    Err: Into<BoxError>,
{
    type Error = Err;

    async fn call(&self, env: Environment) -> Result<AppResponse, Self::Error> {
        (self.f)(env).await
    }
}

/// Turns an async function into an [`Application`].
///
/// ```
/// use micro_rack::application::make_application;
/// use micro_rack::protocol::{AppResponse, BoxError, Environment};
///
/// async fn echo(env: Environment) -> Result<AppResponse, BoxError> {
///     Ok(http::Response::new(env.body().clone().into()))
/// }
///
/// let app = make_application(echo);
/// # let _ = app;
/// ```
pub fn make_application<F, Fut, Err>(f: F) -> ApplicationFn<F>
where
    F: Fn(Environment) -> Fut,
    Fut: Future<Output = Result<AppResponse, Err>>,
    Err: Into<BoxError>,
{
    ApplicationFn { f }
}

/// Calls `app` once and always yields a response.
pub async fn invoke<A: Application>(app: &A, env: Environment) -> AppResponse {
    match AssertUnwindSafe(app.call(env)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            let e: BoxError = e.into();
            error!(cause = %e, "application failed");
            internal_server_error()
        }
        Err(panic) => {
            error!(cause = panic_message(panic.as_ref()), "application panicked");
            internal_server_error()
        }
    }
}

fn internal_server_error() -> AppResponse {
    let mut response = Response::new(ResponseBody::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
