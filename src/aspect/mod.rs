//! Interception around handler calls.
//!
//! An [`Aspect`] observes (and may wrap) every handler call selected by its
//! [`Pointcut`]. Register aspects on the [`Router`](crate::Router):
//!
//! ```rust,no_run
//! use joinpoint::{action, LoggingAspect, Pointcut, Router};
//!
//! let app = Router::new()
//!     .any("/index", action::index)
//!     .aspect(Pointcut::within(action::MODULE), LoggingAspect);
//! ```
//!
//! For every matching aspect, first registered outermost, a call runs as:
//!
//! ```text
//! around  ──┐
//!   before  │
//!     <inner aspects, then the handler>
//!   after_returning | after_throwing
//!   after   │
//! around  ──┘
//! ```
//!
//! Handler panics are caught and reported as a [`Failure`] with
//! [`FailureKind::Panic`](crate::FailureKind::Panic).

mod logging;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, Failure, Outcome};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

pub use logging::LoggingAspect;

// ── JoinPoint ─────────────────────────────────────────────────────────────────

/// One intercepted handler call.
#[derive(Debug)]
pub struct JoinPoint {
    signature: &'static str,
    method: Method,
    path: String,
    args: Args,
}

impl JoinPoint {
    pub(crate) fn new(signature: &'static str, req: &Request) -> Self {
        let args = req.params().iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(req.query_pairs().map(|(k, v)| (k.to_owned(), v.to_owned())))
            .collect();
        Self {
            signature,
            method: req.method(),
            path: req.path().to_owned(),
            args: Args(args),
        }
    }

    /// Full type path of the handler, e.g. `joinpoint::action::index`.
    pub fn signature(&self) -> &'static str { self.signature }

    /// Last segment of [`signature`](Self::signature), e.g. `index`.
    pub fn name(&self) -> &'static str {
        self.signature.rsplit("::").next().unwrap_or(self.signature)
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn args(&self) -> &Args { &self.args }
}

/// Handler arguments: path params first, then query pairs.
#[derive(Debug, Default)]
pub struct Args(Vec<(String, String)>);

impl Args {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Renders as `[id=42, verbose=1]`.
impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("]")
    }
}

// ── Pointcut ──────────────────────────────────────────────────────────────────

/// Selects the handlers an aspect applies to, by handler signature.
#[derive(Clone, Debug)]
pub enum Pointcut {
    /// Every handler.
    Any,
    /// Handlers defined in a module or any of its submodules.
    Within(Cow<'static, str>),
    /// Exactly one handler.
    Named(Cow<'static, str>),
}

impl Pointcut {
    pub fn any() -> Self {
        Self::Any
    }

    /// `Pointcut::within("app::action")` matches `app::action::index` and
    /// `app::action::admin::purge`, but not `app::actions::index`.
    pub fn within(module: impl Into<Cow<'static, str>>) -> Self {
        Self::Within(module.into())
    }

    pub fn named(path: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(path.into())
    }

    pub fn matches(&self, signature: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Within(module) => signature
                .strip_prefix(module.as_ref())
                .is_some_and(|rest| rest.starts_with("::")),
            Self::Named(path) => signature == path,
        }
    }
}

// ── Aspect ────────────────────────────────────────────────────────────────────

/// Advice run around handler calls.
///
/// Every method has a no-op default; implement only what you need.
pub trait Aspect: Send + Sync + 'static {
    /// Runs before the handler.
    fn before(&self, _jp: &JoinPoint) {}

    /// Runs after the handler, whether it returned or failed.
    fn after(&self, _jp: &JoinPoint) {}

    /// Runs after the handler returned a response.
    fn after_returning(&self, _jp: &JoinPoint, _res: &Response) {}

    /// Runs after the handler failed.
    fn after_throwing(&self, _jp: &JoinPoint, _failure: &Failure) {}

    /// Wraps the rest of the call. Not calling [`Proceed::proceed`]
    /// short-circuits the handler and every inner aspect.
    fn around(&self, _jp: Arc<JoinPoint>, proceed: Proceed) -> BoxFuture<Outcome> {
        Box::pin(proceed.proceed())
    }
}

// ── Advice chain ──────────────────────────────────────────────────────────────

/// The rest of an advised call, handed to [`Aspect::around`].
pub struct Proceed {
    aspect: Arc<dyn Aspect>,
    rest: Chain,
}

impl Proceed {
    pub fn join_point(&self) -> &JoinPoint {
        &self.rest.join_point
    }

    /// Runs `before`, the inner chain, `after_returning`/`after_throwing`
    /// and `after`, and returns the inner outcome.
    pub async fn proceed(self) -> Outcome {
        let jp = Arc::clone(&self.rest.join_point);
        self.aspect.before(&jp);
        let outcome = self.rest.run().await;
        match &outcome {
            Ok(res) => self.aspect.after_returning(&jp, res),
            Err(failure) => self.aspect.after_throwing(&jp, failure),
        }
        self.aspect.after(&jp);
        outcome
    }
}

struct Chain {
    join_point: Arc<JoinPoint>,
    aspects: Arc<[Arc<dyn Aspect>]>,
    next: usize,
    handler: BoxedHandler,
    request: Request,
}

impl Chain {
    fn run(self) -> BoxFuture<Outcome> {
        let Some(aspect) = self.aspects.get(self.next).cloned() else {
            return invoke(self.handler, self.request);
        };
        let jp = Arc::clone(&self.join_point);
        let proceed = Proceed {
            aspect: Arc::clone(&aspect),
            rest: Chain { next: self.next + 1, ..self },
        };
        aspect.around(jp, proceed)
    }
}

/// Calls the handler on its own task so a panic surfaces as a `JoinError`
/// instead of unwinding through the aspects.
fn invoke(handler: BoxedHandler, request: Request) -> BoxFuture<Outcome> {
    Box::pin(detached(handler.call(request)))
}

/// Runs `fut` on a task of its own. The task keeps going if the caller is
/// dropped, so advice started for a request always runs to the end.
async fn detached(fut: BoxFuture<Outcome>) -> Outcome {
    match tokio::spawn(fut).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(Failure::panic(e.into_panic())),
        Err(e) => Err(Failure::error(e)),
    }
}

/// Runs `handler` for `request` through `aspects`, outermost first.
///
/// The whole chain runs detached from the caller: a client that hangs up
/// mid-call does not cut `after` advice short.
pub(crate) fn advise(
    aspects: Vec<Arc<dyn Aspect>>,
    handler: BoxedHandler,
    request: Request,
) -> BoxFuture<Outcome> {
    let join_point = Arc::new(JoinPoint::new(handler.signature(), &request));
    let chain = Chain {
        join_point,
        aspects: aspects.into(),
        next: 0,
        handler,
        request,
    };
    Box::pin(detached(Box::pin(async move { chain.run().await })))
}
