//! The conversion endpoint.
//!
//! Every method is routed here so the method guard, not the router, decides
//! between 405 and 501. The body limit is enforced by the transport layer.

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::routing::any;
use std::sync::Arc;
use tracing::debug;

use crate::error::Problem;
use crate::handlers::convert::{self, Rendered};
use crate::request::IncomingRequest;
use crate::state::AppState;
use crate::validation::{method, upload};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", any(handle))
        .layer(DefaultBodyLimit::disable())
}

async fn handle(State(state): State<Arc<AppState>>, request: Request) -> Result<Rendered, Problem> {
    method::guard(request.method())?;

    let incoming = IncomingRequest::from_http(request, &state).await;
    let conversion = upload::validate(&incoming, state.upload_limit)?;
    debug!(filename = %conversion.filename, "upload accepted");

    // `incoming` owns the spooled file and must outlive the conversion.
    let rendered = convert::convert(Arc::clone(&state.converter), conversion).await;
    drop(incoming);
    rendered
}

#[cfg(test)]
mod test {
    use crate::config::Config;
    use crate::error::{MALFORMED_SYNTAX_TYPE, PROBLEM_JSON, SERIALIZE_ERROR_TYPE};
    use crate::limits::UploadLimits;
    use crate::multipart::FormData;
    use crate::multipart::test::decode_body;
    use crate::routes;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use dictapi_convert::{BuiltinConverter, ConvertError, Converter, Dictionary, Logged, OutputFile};
    use serde_json::Value;
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;
    use tracing_test::traced_test;

    async fn send(config: Config, converter: Arc<dyn Converter>, request: Request<Body>) -> Response {
        let app = routes::build(Arc::new(AppState::new(config, converter)));
        app.oneshot(request).await.unwrap()
    }

    async fn send_default(request: Request<Body>) -> Response {
        send(Config::default(), Arc::new(BuiltinConverter), request).await
    }

    fn empty(method: Method) -> Request<Body> {
        Request::builder().method(method).uri("/").body(Body::empty()).unwrap()
    }

    fn post(form: &mut FormData) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, form.content_type().unwrap())
            .body(Body::from(form.encode().unwrap()))
            .unwrap()
    }

    fn upload(name: &str, contents: &str) -> FormData {
        upload_with(&[], name, contents)
    }

    /// Text fields first, then the `input` file.
    fn upload_with(fields: &[(&str, &str)], name: &str, contents: &str) -> FormData {
        let mut form = FormData::new();
        for (key, value) in fields {
            form.append(key, value, None, None).unwrap();
        }
        form.append("input", contents, Some(name), Some("text/csv")).unwrap();
        form
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    /// Status plus the parsed problem document.
    async fn problem(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        assert_eq!(response.headers()[header::CONTENT_TYPE], PROBLEM_JSON);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = body_bytes(response).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn known_methods_are_not_allowed() {
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let response = send_default(empty(method.clone())).await;
            assert_eq!(response.headers()[header::ALLOW], "POST");
            let (status, doc) = problem(response).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(doc["title"], "Method Not Allowed");
            assert_eq!(doc["status"], 405);
            assert!(doc.get("type").is_none());
            assert_eq!(
                doc["detail"],
                format!("{method} method is not available. Use the POST method.")
            );
        }

        let response = send_default(empty(Method::HEAD)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
    }

    #[tokio::test]
    async fn other_methods_are_not_implemented() {
        let methods = [
            Method::OPTIONS,
            Method::TRACE,
            Method::PATCH,
            Method::from_bytes(b"post").unwrap(),
            Method::from_bytes(b"get").unwrap(),
        ];
        for method in methods {
            let response = send_default(empty(method.clone())).await;
            assert!(response.headers().get(header::ALLOW).is_none());
            let (status, doc) = problem(response).await;
            assert_eq!(status, StatusCode::NOT_IMPLEMENTED, "{method}");
            assert_eq!(doc["title"], "Not Implemented");
        }
    }

    #[tokio::test]
    async fn missing_input_is_bad_request() {
        let mut form = FormData::new();
        form.append("to", "quiz", None, None).unwrap();
        let (status, doc) = problem(send_default(post(&mut form)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(doc["detail"], "Send the dictionary file with the input key.");

        // A text field named `input` is not a file.
        let mut form = FormData::new();
        form.append("input", "text\ncat\n", None, None).unwrap();
        let (status, _) = problem(send_default(post(&mut form)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = problem(send_default(empty(Method::POST)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn declared_length_over_limit_is_too_large() {
        let mut form = upload("animals.csv", "text\ncat\n");
        let mut request = post(&mut form);
        request
            .headers_mut()
            .insert(header::CONTENT_LENGTH, (3 * 1024 * 1024).to_string().parse().unwrap());

        let (status, doc) = problem(send_default(request).await).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(doc["title"], "Payload Too Large");
        assert_eq!(
            doc["detail"],
            "Failed to upload the file. The file size must not exceed 2 MB."
        );
    }

    #[tokio::test]
    async fn oversized_file_is_too_large() {
        let config = Config {
            limits: UploadLimits {
                upload_max_filesize: 8,
                ..UploadLimits::default()
            },
            ..Config::default()
        };
        let mut form = upload("animals.csv", "text\ncat\ndog\nbird\n");
        let (status, doc) = problem(send(config, Arc::new(BuiltinConverter), post(&mut form)).await).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            doc["detail"],
            "Failed to upload the file. The file size must not exceed 8 B."
        );
    }

    #[tokio::test]
    async fn empty_file_part_is_too_large() {
        let mut form = FormData::new();
        form.append("input", "", Some(""), Some("application/octet-stream"))
            .unwrap();
        let (status, _) = problem(send_default(post(&mut form)).await).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_upload_dir_is_internal_and_reported() {
        let config = Config {
            upload_dir: std::env::temp_dir().join(format!("dictapi-absent-{}", uuid::Uuid::new_v4())),
            ..Config::default()
        };
        let mut form = upload("animals.csv", "text\ncat\n");
        let (status, doc) = problem(send(config, Arc::new(BuiltinConverter), post(&mut form)).await).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(doc["detail"], "Failed to upload the file.");
        assert!(doc.get("type").is_none());
        assert!(logs_contain("error code 6"));
    }

    #[tokio::test]
    async fn converts_to_the_default_format() {
        let mut form = upload("animals.csv", "text,answer\ncat,ねこ\ndog,いぬ\n");
        let response = send_default(post(&mut form)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=UTF-8; header=present"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename*=UTF-8''animals.csv"
        );
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.starts_with("text,answer\r\n"));
        assert!(body.contains("cat,ねこ\r\n"));
    }

    #[tokio::test]
    async fn title_field_names_the_output() {
        let mut form = upload_with(&[("title", "動物"), ("to", "wordlist")], "animals.csv", "text\ncat\n");
        let response = send_default(post(&mut form)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename*=UTF-8''%E5%8B%95%E7%89%A9.txt"
        );
        assert_eq!(body_bytes(response).await, b"cat\n");
    }

    #[tokio::test]
    async fn unrepresentable_target_is_a_serialize_error() {
        let mut form = upload_with(&[("to", "quiz")], "animals.csv", "text\ncat\n");
        let (status, doc) = problem(send_default(post(&mut form)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(doc["type"], SERIALIZE_ERROR_TYPE);
        assert_eq!(doc["title"], "Serialize Error");
        assert!(doc["detail"].as_str().unwrap().contains("cat"));
    }

    #[tokio::test]
    async fn invalid_source_is_malformed_syntax() {
        let mut form = upload("animals.csv", "text\n\"cat\n");
        let (status, doc) = problem(send_default(post(&mut form)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(doc["type"], MALFORMED_SYNTAX_TYPE);
        assert_eq!(doc["title"], "Malformed Syntax");
    }

    #[tokio::test]
    async fn diagnostics_are_bundled() {
        let mut form = upload("animals.csv", "text\ncat\ncat\ndog\n");
        let response = send_default(post(&mut form)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
        let content_type = response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_owned();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let parts = decode_body(&content_type, body_bytes(response).await).await;
        let names: Vec<_> = parts.iter().map(|p| p.name.as_deref()).collect();
        assert_eq!(names, [Some("output"), Some("parser-logs")]);
        assert_eq!(parts[0].filename.as_deref(), Some("animals.csv"));

        let logs: Value = serde_json::from_slice(&parts[1].body).unwrap();
        assert_eq!(logs["logs"][0]["level"], "warning");
        assert!(logs["logs"][0]["message"].as_str().unwrap().contains("cat"));
    }

    struct Panicking;

    impl Converter for Panicking {
        fn parse(
            &self,
            _file: &Path,
            _from: Option<&str>,
            _filename: &str,
            _title: Option<&str>,
        ) -> Result<Logged<Dictionary>, ConvertError> {
            panic!("parser exploded");
        }

        fn serialize(&self, _dictionary: &Dictionary, _to: Option<&str>) -> Result<Logged<OutputFile>, ConvertError> {
            Err(ConvertError::Internal("unreachable".into()))
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn converter_panic_is_internal_and_reported() {
        let mut form = upload("animals.csv", "text\ncat\n");
        let response = send(Config::default(), Arc::new(Panicking), post(&mut form)).await;
        let (status, doc) = problem(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(doc["detail"], "Failed to convert the file.");
        assert!(logs_contain("parser exploded"));
    }

    #[tokio::test]
    async fn health_is_served() {
        let response = send_default(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "ok");
    }
}
