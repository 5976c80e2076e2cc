//! # Server Module
//!
//! Request and response value objects, cookies, and the HTTP hosting adapter.
//!
//! The framework core never touches sockets. [`HttpServer`] is one host: it
//! turns wire requests into [`Request`]s, calls
//! [`crate::dispatcher::Application::respond`], and writes the [`Response`]
//! back, driving streamed bodies to completion.

mod cookie;
mod http_server;
mod request;
mod response;

pub use cookie::{parse_cookie_header, parse_set_cookie, Cookie};
pub use http_server::{HttpServer, ServerHandle};
pub use request::{Content, Request, RequestBody, RequestId};
pub use response::{
    Body, Response, StreamBody, APPLICATION_JSON, OCTET_STREAM, TEXT_HTML, TEXT_PLAIN,
};
