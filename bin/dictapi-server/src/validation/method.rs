use axum::http::Method;

use crate::error::{Problem, ProblemKind};

/// Accept `POST`; reject everything else as 405 or 501.
///
/// Method tokens are case-sensitive, so `post` is not `POST`.
pub fn guard(method: &Method) -> Result<(), Problem> {
    let kind = match *method {
        Method::POST => return Ok(()),
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE => ProblemKind::MethodNotAllowed,
        _ => ProblemKind::NotImplemented,
    };
    Err(Problem::new(
        kind,
        format!("{method} method is not available. Use the POST method."),
    ))
}
