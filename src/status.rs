//! HTTP status codes as a typed enum.
//!
//! ```rust
//! use joinpoint::{Response, Status};
//!
//! Response::status(Status::NotFound);
//!
//! async fn reject(_req: joinpoint::Request) -> Status {
//!     Status::BadRequest
//! }
//! ```

/// The status codes this crate produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                  // 200
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405
    ContentTooLarge,     // 413
    InternalServerError, // 500
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::ContentTooLarge     => 413,
            Status::InternalServerError => 500,
        }
    }
}
