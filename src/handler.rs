//! Handler trait, type erasure and handler outcomes.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of different types in one map, so each one is
//! hidden behind `dyn ErasedHandler`:
//!
//! ```text
//! async fn index(req: Request) -> &'static str { … }   ← user writes this
//!        ↓ router.any("/index", index)
//! index.into_boxed_handler()                           ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(index))                           ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time                   ← one vtable dispatch
//!        ↓
//! Box::pin(async { index(req).await.into_outcome() })  ← BoxFuture<Outcome>
//! ```
//!
//! Besides the call itself, the erased handler remembers its own type path
//! (`joinpoint::action::index`). That path is the handler's *signature*, and
//! it is what a [`Pointcut`](crate::Pointcut) matches against.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::status::Status;

// ── Outcome ───────────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` so tokio can move it between worker threads.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What a handler call produced: a response, or a failure.
pub type Outcome = Result<Response, Failure>;

/// How a handler failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The handler returned `Err`.
    Error,
    /// The handler panicked.
    Panic,
}

/// A failed handler call.
///
/// Aspects see it in `after_throwing`; the client sees `500`.
#[derive(Clone, Debug)]
pub struct Failure {
    kind: FailureKind,
    message: String,
}

impl Failure {
    pub fn error(message: impl fmt::Display) -> Self {
        Self { kind: FailureKind::Error, message: message.to_string() }
    }

    /// Builds a failure from a panic payload as returned by
    /// `JoinError::into_panic` or `catch_unwind`.
    pub fn panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload.downcast_ref::<&str>().map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self { kind: FailureKind::Panic, message }
    }

    pub fn kind(&self) -> FailureKind { self.kind }
    pub fn message(&self) -> &str { &self.message }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Error => write!(f, "error: {}", self.message),
            FailureKind::Panic => write!(f, "panic: {}", self.message),
        }
    }
}

impl std::error::Error for Failure {}

/// The details stay in the logs.
impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        Response::builder()
            .status(Status::InternalServerError)
            .text("Internal Server Error")
    }
}

/// Conversion of a handler's return value into an [`Outcome`].
///
/// Every [`IntoResponse`] type shipped by this crate is a successful outcome.
/// `Result<T, E>` is a failure when it is `Err`.
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Outcome { Ok(self) }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl IntoOutcome for Status {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoResponse,
    E: fmt::Display,
{
    fn into_outcome(self) -> Outcome {
        self.map(IntoResponse::into_response).map_err(Failure::error)
    }
}

// ── Erased handlers ───────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the public `Handler` trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<Outcome>;

    /// Type path of the wrapped function.
    fn signature(&self) -> &'static str;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoOutcome
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<Outcome> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }

    fn signature(&self) -> &'static str {
        std::any::type_name::<F>()
    }
}
