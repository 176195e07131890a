//! Problem details (RFC 7807) – the only error shape that leaves the server.
//!
//! Every failing stage of the pipeline returns a [`Problem`], which
//! implements [`axum::response::IntoResponse`]. Rendering sets the status,
//! the `application/problem+json` content type and, for 405, the `Allow`
//! header.
//!
//! Internal failures only ever expose a generic detail message. When a
//! [`Fault`] is attached it is reported after the document has been sent.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, error};

use crate::fault::{self, Fault};

pub const PROBLEM_JSON: &str = "application/problem+json; charset=UTF-8";
pub const ABOUT_BLANK: &str = "about:blank";
pub const MALFORMED_SYNTAX_TYPE: &str =
    "https://github.com/esperecyan/dictionary-api/blob/master/malformed-syntax.md";
pub const SERIALIZE_ERROR_TYPE: &str =
    "https://github.com/esperecyan/dictionary-api/blob/master/serialize-error.md";

/// The fixed failure taxonomy of the conversion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    MethodNotAllowed,
    NotImplemented,
    BadRequest,
    PayloadTooLarge,
    MalformedSyntax,
    SerializeError,
    InternalServerError,
}

impl ProblemKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::BadRequest | Self::MalformedSyntax | Self::SerializeError => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::NotImplemented => "Not Implemented",
            Self::BadRequest => "Bad Request",
            Self::PayloadTooLarge => "Payload Too Large",
            Self::MalformedSyntax => "Malformed Syntax",
            Self::SerializeError => "Serialize Error",
            Self::InternalServerError => "Internal Server Error",
        }
    }

    pub fn type_uri(self) -> &'static str {
        match self {
            Self::MalformedSyntax => MALFORMED_SYNTAX_TYPE,
            Self::SerializeError => SERIALIZE_ERROR_TYPE,
            _ => ABOUT_BLANK,
        }
    }
}

/// A failed request, ready to be rendered.
#[derive(Debug)]
pub struct Problem {
    kind: ProblemKind,
    detail: String,
    fault: Option<Fault>,
}

/// Wire shape of a problem document.
#[derive(Debug, Serialize)]
pub struct ProblemDocument<'a> {
    #[serde(rename = "type", skip_serializing_if = "is_about_blank")]
    pub type_uri: &'a str,
    pub title: &'a str,
    pub status: u16,
    pub detail: &'a str,
}

fn is_about_blank(type_uri: &&str) -> bool {
    *type_uri == ABOUT_BLANK
}

impl Problem {
    pub fn new(kind: ProblemKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            fault: None,
        }
    }

    /// An internal error whose cause is reported after the response.
    pub fn internal(detail: impl Into<String>, fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::new(ProblemKind::InternalServerError, detail)
        }
    }

    pub fn kind(&self) -> ProblemKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn document(&self) -> ProblemDocument<'_> {
        ProblemDocument {
            type_uri: self.kind.type_uri(),
            title: self.kind.title(),
            status: self.kind.status().as_u16(),
            detail: &self.detail,
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.kind().status();
        debug!(
            status = status.as_u16(),
            detail = %self.detail(),
            fault = ?self.fault().map(Fault::origin),
            "rendering problem"
        );

        let document = pretty_json(&self.document());
        let headers = [(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON))];
        let mut response = match self.fault {
            Some(fault) => (status, headers, fault::body_then_report(document, fault)).into_response(),
            None => (status, headers, document).into_response(),
        };
        if self.kind == ProblemKind::MethodNotAllowed {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Pretty-printed JSON with a four-space indent. Slashes and non-ASCII text
/// are written literally.
pub fn pretty_json<T: Serialize>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    if let Err(e) = value.serialize(&mut serializer) {
        error!(error = %e, "failed to serialize JSON document");
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn about_blank_type_is_omitted() {
        let problem = Problem::new(ProblemKind::BadRequest, "Send the dictionary file with the input key.");
        let json = String::from_utf8(pretty_json(&problem.document())).unwrap();
        assert_eq!(
            json,
            "{\n    \"title\": \"Bad Request\",\n    \"status\": 400,\n    \"detail\": \"Send the dictionary file with the input key.\"\n}"
        );
    }

    #[test]
    fn documented_types_keep_slashes_and_unicode() {
        let problem = Problem::new(ProblemKind::MalformedSyntax, "「猫」は重複/不正です");
        let json = String::from_utf8(pretty_json(&problem.document())).unwrap();
        assert!(json.starts_with(&format!("{{\n    \"type\": \"{MALFORMED_SYNTAX_TYPE}\",\n")));
        assert!(json.contains("「猫」は重複/不正です"));
    }

    #[test]
    fn taxonomy_statuses() {
        let cases = [
            (ProblemKind::MethodNotAllowed, 405),
            (ProblemKind::NotImplemented, 501),
            (ProblemKind::BadRequest, 400),
            (ProblemKind::PayloadTooLarge, 413),
            (ProblemKind::MalformedSyntax, 400),
            (ProblemKind::SerializeError, 400),
            (ProblemKind::InternalServerError, 500),
        ];
        for (kind, status) in cases {
            assert_eq!(kind.status().as_u16(), status, "{kind:?}");
        }
        assert_eq!(ProblemKind::SerializeError.type_uri(), SERIALIZE_ERROR_TYPE);
        assert_eq!(ProblemKind::InternalServerError.type_uri(), ABOUT_BLANK);
    }

    #[tokio::test]
    async fn method_not_allowed_carries_allow_header() {
        let response = Problem::new(ProblemKind::MethodNotAllowed, "GET").into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
        assert_eq!(response.headers()[header::CONTENT_TYPE], PROBLEM_JSON);
    }
}
