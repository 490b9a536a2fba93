use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use api_server::http::SESSION_COOKIE_NAME;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Remembers the session cookie between requests the way a browser would.
#[derive(Default)]
pub struct Browser {
    cookie: Option<String>,
}

impl Browser {
    pub fn with_cookie(value: &str) -> Self {
        Self {
            cookie: Some(value.to_string()),
        }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub async fn get(&mut self, app: &axum::Router, uri: &str) -> TestResponse {
        self.send(app, Method::GET, uri, None).await
    }

    pub async fn post(&mut self, app: &axum::Router, uri: &str) -> TestResponse {
        self.send(app, Method::POST, uri, None).await
    }

    pub async fn ask(&mut self, app: &axum::Router, message: &str) -> TestResponse {
        let body = format!("msg={}", form_encode(message));
        self.send(app, Method::POST, "/get", Some(body)).await
    }

    pub async fn send(
        &mut self,
        app: &axum::Router,
        method: Method,
        uri: &str,
        form_body: Option<String>,
    ) -> TestResponse {
        let response = send(app, request(method, uri, self.cookie.as_deref(), form_body)).await;
        if let Some(set_cookie) = response.set_cookie() {
            self.cookie = session_cookie_from(set_cookie);
        }
        response
    }
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let text = String::from_utf8_lossy(&body).into_owned();
    let body = serde_json::from_slice::<Value>(&body).unwrap_or_else(|_| json!({}));

    TestResponse {
        status,
        headers,
        text,
        body,
    }
}

pub fn request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    form_body: Option<String>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={cookie}"));
    }

    match form_body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

fn session_cookie_from(set_cookie: &str) -> Option<String> {
    let (name, value) = set_cookie.split(';').next()?.split_once('=')?;
    if name != SESSION_COOKIE_NAME || value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

fn form_encode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
