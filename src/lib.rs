//! # joinpoint
//!
//! A small HTTP service whose handlers are observed by aspects.
//!
//! Routing and HTTP stay plain: a radix-tree [`Router`] in front of hyper.
//! What this crate adds is interception. An [`Aspect`] registered with a
//! [`Pointcut`] sees every matching handler call: before it runs, after it
//! returns or fails, and around the whole call.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use joinpoint::{LoggingAspect, Pointcut, Request, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), joinpoint::Error> {
//!     let app = Router::new()
//!         .any("/hello", hello)
//!         .aspect(Pointcut::any(), LoggingAspect);
//!
//!     Server::bind("0.0.0.0:8080").await?.serve(app).await
//! }
//!
//! async fn hello(_req: Request) -> &'static str {
//!     "hello"
//! }
//! ```
//!
//! The binary wires the bundled [`action`] layer the same way; see [`app`].

mod config;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod action;
pub mod aspect;

pub use aspect::{Aspect, JoinPoint, LoggingAspect, Pointcut, Proceed};
pub use config::Config;
pub use error::Error;
pub use handler::{BoxFuture, Failure, FailureKind, Handler, IntoOutcome, Outcome};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;

/// The application router: `/index` on any method, with every action-layer
/// handler advised by [`LoggingAspect`].
pub fn app() -> Router {
    Router::new()
        .any("/index", action::index)
        .aspect(Pointcut::within(action::MODULE), LoggingAspect)
}
