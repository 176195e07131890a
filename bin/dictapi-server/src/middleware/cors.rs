//! Cross-origin access.
//!
//! The endpoint is public: every response carries
//! `access-control-allow-origin: *`. There is no preflight handling:
//! `OPTIONS` reaches the method guard like any other verb.

use axum::http::{HeaderValue, header};
use tower_http::set_header::SetResponseHeaderLayer;

pub fn cors_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"))
}
