//! The application's action layer.
//!
//! Every handler here is advised by the aspect registered on
//! [`MODULE`] in the binary.

use std::time::Duration;

use tracing::info;

use crate::Request;

/// Module path handlers in this layer share, for [`Pointcut::within`](crate::Pointcut::within).
pub const MODULE: &str = module_path!();

/// Added latency of [`index`].
pub const INDEX_DELAY: Duration = Duration::from_secs(1);

/// Fixed body of [`index`].
pub const INDEX_BODY: &str = "返回页面";

/// `/index`, any method. Waits [`INDEX_DELAY`], then returns [`INDEX_BODY`].
pub async fn index(_req: Request) -> &'static str {
    info!("controller method executing");
    tokio::time::sleep(INDEX_DELAY).await;
    INDEX_BODY
}
