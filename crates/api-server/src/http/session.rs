use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared::chat::SessionContext;
use tracing::{debug, warn};

pub const SESSION_COOKIE_NAME: &str = "medibot_session";

/// Signs and verifies the cookie that carries a browser's [`SessionContext`].
///
/// Cookie value: `base64url(json) "." hex(hmac_sha256(secret, base64url(json)))`.
#[derive(Clone)]
pub struct SessionCookieCodec {
    secret: Arc<[u8]>,
    secure: bool,
}

impl SessionCookieCodec {
    pub fn new(secret: impl AsRef<[u8]>, secure: bool) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            secure,
        }
    }

    pub fn encode(&self, session: &SessionContext) -> Result<String, serde_json::Error> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(session)?);
        let signature = self.sign(&payload);
        Ok(format!("{payload}.{signature}"))
    }

    /// Returns `None` for malformed or tampered values.
    pub fn decode(&self, value: &str) -> Option<SessionContext> {
        let (payload, signature) = value.split_once('.')?;
        if !constant_time_eq(&self.sign(payload), signature) {
            return None;
        }

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice::<SessionContext>(&json).ok()
    }

    pub fn read(&self, headers: &HeaderMap) -> Option<SessionContext> {
        let raw = cookie_value(headers, SESSION_COOKIE_NAME)?;
        let session = self.decode(raw);
        if session.is_none() {
            warn!("ignoring session cookie with invalid signature or payload");
        }
        session
    }

    pub fn set_cookie_header(&self, session: &SessionContext) -> Result<String, serde_json::Error> {
        if session.is_empty() {
            return Ok(format!(
                "{SESSION_COOKIE_NAME}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax{}",
                self.secure_attribute()
            ));
        }

        let value = self.encode(session)?;
        Ok(format!(
            "{SESSION_COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax{}",
            self.secure_attribute()
        ))
    }

    fn secure_attribute(&self) -> &'static str {
        if self.secure { "; Secure" } else { "" }
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any size");
        mac.update(payload.as_bytes());
        to_lower_hex(mac.finalize().into_bytes().as_slice())
    }
}

/// Per-request handle on the caller's session; handlers write back changes and
/// the middleware re-issues the cookie.
#[derive(Clone)]
pub(super) struct SessionSlot(Arc<Mutex<SessionContext>>);

impl SessionSlot {
    fn new(session: SessionContext) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub(super) fn snapshot(&self) -> SessionContext {
        match self.0.lock() {
            Ok(session) => session.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(super) fn replace(&self, session: SessionContext) {
        match self.0.lock() {
            Ok(mut current) => *current = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }
}

pub(super) async fn session_middleware(
    State(codec): State<SessionCookieCodec>,
    mut req: Request,
    next: Next,
) -> Response {
    let initial = codec.read(req.headers()).unwrap_or_default();
    let slot = SessionSlot::new(initial.clone());
    req.extensions_mut().insert(slot.clone());

    let mut response = next.run(req).await;

    let current = slot.snapshot();
    if current == initial {
        return response;
    }

    match codec
        .set_cookie_header(&current)
        .map(|cookie| HeaderValue::from_str(&cookie))
    {
        Ok(Ok(cookie)) => {
            response.headers_mut().append(header::SET_COOKIE, cookie);
            debug!(
                user_id = current.user_id.as_deref().unwrap_or_default(),
                "session cookie updated"
            );
        }
        Ok(Err(err)) => warn!(error = %err, "session cookie is not a valid header value"),
        Err(err) => warn!(error = %err, "failed to encode session cookie"),
    }

    response
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

fn constant_time_eq(left: &str, right: &str) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut diff = 0_u8;
    for (lhs, rhs) in left.as_bytes().iter().zip(right.as_bytes().iter()) {
        diff |= lhs ^ rhs;
    }

    diff == 0
}

fn to_lower_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
