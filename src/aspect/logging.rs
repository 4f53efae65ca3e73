//! Logs every stage of an advised call.

use std::sync::Arc;

use tracing::{error, info};

use super::{Aspect, JoinPoint, Proceed};
use crate::handler::{BoxFuture, Failure, Outcome};
use crate::response::Response;

/// Emits one `tracing` event per advice: entry, exit, result and failure.
///
/// Response bodies are logged as lossy UTF-8.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingAspect;

impl Aspect for LoggingAspect {
    fn before(&self, jp: &JoinPoint) {
        info!(handler = jp.name(), args = %jp.args(), "before");
    }

    fn after(&self, jp: &JoinPoint) {
        info!(handler = jp.name(), "after");
    }

    fn after_returning(&self, jp: &JoinPoint, res: &Response) {
        info!(
            handler = jp.name(),
            status = res.status_code(),
            body = %String::from_utf8_lossy(res.body()),
            "after returning"
        );
    }

    fn after_throwing(&self, jp: &JoinPoint, failure: &Failure) {
        error!(handler = jp.name(), %failure, "after throwing");
    }

    fn around(&self, jp: Arc<JoinPoint>, proceed: Proceed) -> BoxFuture<Outcome> {
        Box::pin(async move {
            info!(handler = jp.name(), args = %jp.args(), "around start");
            let outcome = proceed.proceed().await;
            match &outcome {
                Ok(res) => info!(
                    handler = jp.name(),
                    result = %String::from_utf8_lossy(res.body()),
                    "around end"
                ),
                Err(failure) => info!(handler = jp.name(), %failure, "around end"),
            }
            outcome
        })
    }
}
