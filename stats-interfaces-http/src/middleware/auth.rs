use std::io::Read;

use anyhow::{anyhow, Result};
use axum::body::Body;
use axum::extract::{Form, FromRequest};
use axum::http::{header, HeaderMap, Request};
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};

use stats_domain::{RawEvent, RuntimeConfig};

/// Operator endpoints. Open when no api token is configured.
pub fn authorize(config: &RuntimeConfig, headers: &HeaderMap) -> bool {
    if let Some(api_token) = &config.api_token {
        return extract_bearer(headers)
            .map(|v| v == *api_token)
            .unwrap_or(false);
    }
    true
}

/// Game servers present a shared secret, either as a bearer token or as the
/// `server_token` field of the event. Only its SHA-256 digest is configured.
pub fn authorize_server(config: &RuntimeConfig, headers: &HeaderMap, event: &RawEvent) -> bool {
    if config.server_token_sha256.is_empty() {
        return true;
    }
    let token = extract_bearer(headers).or_else(|| {
        let token = event.server_token.trim();
        (!token.is_empty()).then(|| token.to_string())
    });
    let Some(token) = token else {
        return false;
    };
    let digest = sha256_hex(&token);
    config
        .server_token_sha256
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&digest))
}

pub fn sha256_hex(value: &str) -> String {
    Sha256::digest(value.as_bytes())
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Decodes one event from a JSON or URL-encoded body, gunzipping first when
/// the client says so.
pub async fn parse_event(headers: &HeaderMap, body: &[u8]) -> Result<RawEvent> {
    let body = maybe_gunzip(headers, body)?;
    if is_form(headers) {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))?;
        let Form(event) = Form::<RawEvent>::from_request(request, &())
            .await
            .map_err(|rejection| anyhow!(rejection.body_text()))?;
        return Ok(event);
    }
    Ok(serde_json::from_slice(&body)?)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

fn maybe_gunzip(headers: &HeaderMap, body: &[u8]) -> Result<Vec<u8>> {
    if let Some(encoding) = headers.get(header::CONTENT_ENCODING) {
        if encoding.to_str().unwrap_or("").eq_ignore_ascii_case("gzip") {
            let mut decoder = GzDecoder::new(body);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            return Ok(out);
        }
    }
    Ok(body.to_vec())
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
