//! The normalized per-request environment handed to the application.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::uri::Authority;
use http::{HeaderMap, Method, Request, Version};

use crate::protocol::RequestHeader;

const DEFAULT_HTTP_PORT: u16 = 80;

/// Addresses of the transport connection a request arrived on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub local_addr: Option<SocketAddr>,
    pub remote_addr: Option<SocketAddr>,
}

impl ConnectionInfo {
    pub fn new(local_addr: Option<SocketAddr>, remote_addr: Option<SocketAddr>) -> Self {
        Self { local_addr, remote_addr }
    }
}

/// A parsed request plus the protocol metadata of the connection it came from.
///
/// Built once per request and moved into the application; the adapter keeps
/// no reference to it after the call returns.
#[derive(Debug)]
pub struct Environment {
    request: Request<Bytes>,
    server_name: String,
    server_port: u16,
    remote_addr: Option<SocketAddr>,
}

impl Environment {
    /// Builds the environment from a request header, its fully read body and
    /// the connection addresses.
    ///
    /// `SERVER_NAME`/`SERVER_PORT` come from the `Host` header when it parses
    /// as an authority, otherwise from the local socket address.
    pub fn build(header: RequestHeader, body: Bytes, info: &ConnectionInfo) -> Self {
        let authority = header.headers().get(HOST).and_then(|value| value.to_str().ok()).and_then(|host| host.parse::<Authority>().ok());

        let server_name = match (&authority, info.local_addr) {
            (Some(authority), _) => authority.host().to_string(),
            (None, Some(local_addr)) => local_addr.ip().to_string(),
            (None, None) => String::new(),
        };

        let server_port = authority
            .as_ref()
            .and_then(Authority::port_u16)
            .or_else(|| info.local_addr.map(|addr| addr.port()))
            .unwrap_or(DEFAULT_HTTP_PORT);

        Self { request: header.body(body), server_name, server_port, remote_addr: info.remote_addr }
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// The raw query string without the leading `?`, empty when absent.
    pub fn query(&self) -> &str {
        self.request.uri().query().unwrap_or("")
    }

    pub fn version(&self) -> Version {
        self.request.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    pub fn url_scheme(&self) -> &'static str {
        "http"
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn into_request(self) -> Request<Bytes> {
        self.request
    }

    /// CGI style variables describing this request.
    ///
    /// Every header other than `Content-Type`/`Content-Length` becomes
    /// `HTTP_<NAME>`, with repeated values joined by `", "` in arrival order.
    pub fn vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("REQUEST_METHOD".to_string(), self.method().as_str().to_string());
        vars.insert("SCRIPT_NAME".to_string(), String::new());
        vars.insert("PATH_INFO".to_string(), self.path().to_string());
        vars.insert("QUERY_STRING".to_string(), self.query().to_string());
        vars.insert("SERVER_NAME".to_string(), self.server_name.clone());
        vars.insert("SERVER_PORT".to_string(), self.server_port.to_string());
        vars.insert("SERVER_PROTOCOL".to_string(), format!("{:?}", self.version()));
        vars.insert("URL_SCHEME".to_string(), self.url_scheme().to_string());

        if let Some(remote_addr) = self.remote_addr {
            vars.insert("REMOTE_ADDR".to_string(), remote_addr.ip().to_string());
        }

        for name in self.headers().keys() {
            let value = self
                .headers()
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");

            let key = if name == CONTENT_TYPE {
                "CONTENT_TYPE".to_string()
            } else if name == CONTENT_LENGTH {
                "CONTENT_LENGTH".to_string()
            } else {
                format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_"))
            };
            vars.insert(key, value);
        }

        if !vars.contains_key("CONTENT_LENGTH") && !self.body().is_empty() {
            vars.insert("CONTENT_LENGTH".to_string(), self.body().len().to_string());
        }

        vars
    }
}
