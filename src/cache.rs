use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";
const SHORT_CACHE: &str = "public, max-age=3600, must-revalidate";
const IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Cache policy for a request path, decided by its file extension.
///
/// Paths without an extension are SPA routes answered with `index.html`,
/// so they get the HTML policy.
pub fn policy_for(path: &str) -> &'static str {
    let file = path.rsplit('/').next().unwrap_or_default();

    match file.rsplit_once('.') {
        None => NO_CACHE,
        Some((_, ext)) => match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => NO_CACHE,
            "js" | "css" => SHORT_CACHE,
            _ => IMMUTABLE,
        },
    }
}

/// Cache policy for a served response. HTML is never cached, whatever the
/// path looked like, since missing assets fall back to `index.html`.
pub fn policy_for_response(path: &str, content_type: Option<&str>) -> &'static str {
    let is_html = content_type
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false);

    if is_html {
        NO_CACHE
    } else {
        policy_for(path)
    }
}

pub async fn cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let policy = policy_for_response(&path, content_type);

    if response.status().is_success() || response.status().is_redirection() {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(policy));
    }

    response
}
