use http::{Response, StatusCode};
use micro_rack::application::make_application;
use micro_rack::protocol::{AppResponse, BoxError, Environment, ResponseBody};
use micro_rack::server::{Server, ServerConfig};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = ServerConfig::new("127.0.0.1", 8080);
    let server = match Server::start(config, make_application(hello_world)).await {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };
    info!(addr = %server.local_addr(), "start listening, press ctrl-c to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(cause = %e, "can't listen for ctrl-c");
    }
    server.terminate().await;
}

/// `/chunked` answers without a content-length, everything else with one.
async fn hello_world(env: Environment) -> Result<AppResponse, BoxError> {
    info!(method = %env.method(), path = env.path(), body_size = env.body().len(), "receive request");

    let builder = Response::builder().status(StatusCode::OK).header(http::header::CONTENT_TYPE, "text/plain");
    let response = if env.path() == "/chunked" {
        builder.body(ResponseBody::chunks(["hello", " ", "world\r\n"]))?
    } else {
        builder.header(http::header::CONTENT_LENGTH, 13).body(ResponseBody::from("hello world\r\n"))?
    };

    Ok(response)
}
