mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use joinpoint::{
    Aspect, BoxFuture, Failure, JoinPoint, Method, Outcome, Pointcut, Proceed, Request, Response,
    Router, Status,
};

use common::{send, spawn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl Aspect for Journal {
    fn before(&self, jp: &JoinPoint) {
        self.push(format!("before {} {} {}", jp.method(), jp.name(), jp.args()));
    }

    fn after(&self, jp: &JoinPoint) {
        self.push(format!("after {}", jp.name()));
    }

    fn after_returning(&self, _jp: &JoinPoint, res: &Response) {
        self.push(format!("returning {}", String::from_utf8_lossy(res.body())));
    }

    fn after_throwing(&self, _jp: &JoinPoint, failure: &Failure) {
        self.push(format!("throwing {:?}", failure.kind()));
    }
}

/// Rejects calls without a `token` argument before the handler runs.
struct RequireToken;

impl Aspect for RequireToken {
    fn around(&self, jp: Arc<JoinPoint>, proceed: Proceed) -> BoxFuture<Outcome> {
        Box::pin(async move {
            if jp.args().iter().any(|(k, _)| k == "token") {
                proceed.proceed().await
            } else {
                Ok(Response::status(Status::BadRequest))
            }
        })
    }
}

mod action {
    use super::*;

    pub async fn show(req: Request) -> String {
        format!("user {}", req.param("id").unwrap_or("?"))
    }

    pub async fn divide(req: Request) -> String {
        let divisor: i32 = req.param("by").and_then(|s| s.parse().ok()).unwrap_or(0);
        format!("{}", 100 / divisor)
    }

    pub async fn slow(_req: Request) -> &'static str {
        tokio::time::sleep(Duration::from_secs(1)).await;
        "done"
    }

    pub async fn lookup(req: Request) -> Result<String, String> {
        match req.param("id") {
            Some("1") => Ok("alice".to_owned()),
            _ => Err("unknown user".to_owned()),
        }
    }
}

async fn health(_req: Request) -> &'static str {
    "ok"
}

fn router(journal: &Journal) -> Router {
    Router::new()
        .on(Method::Get, "/users/{id}", action::show)
        .on(Method::Get, "/divide/{by}", action::divide)
        .on(Method::Get, "/lookup/{id}", action::lookup)
        .on(Method::Get, "/slow", action::slow)
        .on(Method::Get, "/healthz", health)
        .aspect(Pointcut::within(concat!(module_path!(), "::action")), journal.clone())
}

#[tokio::test]
async fn returning_call_is_fully_advised() {
    let journal = Journal::default();
    let server = spawn(router(&journal)).await;

    let reply = send(server.addr, "GET", "/users/42?verbose=1", "").await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"user 42");
    assert_eq!(journal.take(), [
        "before GET show [id=42, verbose=1]",
        "returning user 42",
        "after show",
    ]);
}

#[tokio::test]
async fn panicking_handler_is_500_and_reported() {
    let journal = Journal::default();
    let server = spawn(router(&journal)).await;

    let reply = send(server.addr, "GET", "/divide/0", "").await;
    assert_eq!(reply.status, 500);
    assert_eq!(journal.take(), [
        "before GET divide [by=0]",
        "throwing Panic",
        "after divide",
    ]);

    // The server keeps serving after a handler panic.
    let reply = send(server.addr, "GET", "/divide/4", "").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"25");
}

#[tokio::test]
async fn err_result_is_500_and_reported() {
    let journal = Journal::default();
    let server = spawn(router(&journal)).await;

    let reply = send(server.addr, "GET", "/lookup/9", "").await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, b"Internal Server Error");
    assert_eq!(journal.take()[1], "throwing Error");

    let reply = send(server.addr, "GET", "/lookup/1", "").await;
    assert_eq!(reply.status, 200);
    assert_eq!(journal.take()[1], "returning alice");
}

#[tokio::test]
async fn handlers_outside_the_pointcut_are_not_advised() {
    let journal = Journal::default();
    let server = spawn(router(&journal)).await;

    let reply = send(server.addr, "GET", "/healthz", "").await;
    assert_eq!(reply.status, 200);
    assert!(journal.take().is_empty());
}

#[tokio::test]
async fn around_advice_can_reject_before_inner_aspects() {
    let journal = Journal::default();
    let app = router(&journal).aspect(Pointcut::any(), RequireToken);
    let server = spawn(app).await;

    // `RequireToken` is registered after the journal, so it runs inside it.
    let reply = send(server.addr, "GET", "/users/1", "").await;
    assert_eq!(reply.status, 400);
    assert_eq!(journal.take(), [
        "before GET show [id=1]",
        "returning ",
        "after show",
    ]);

    let reply = send(server.addr, "GET", "/users/1?token=t", "").await;
    assert_eq!(reply.status, 200);
}

#[tokio::test]
async fn after_advice_runs_when_client_hangs_up() {
    let journal = Journal::default();
    let server = spawn(router(&journal)).await;

    let mut stream = TcpStream::connect(server.addr).await.expect("connect");
    stream.write_all(b"GET /slow HTTP/1.1\r\nhost: test\r\n\r\n").await.expect("write");
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(stream);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(journal.take(), [
        "before GET slow []",
        "returning done",
        "after slow",
    ]);
}
