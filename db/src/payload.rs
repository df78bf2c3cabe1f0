//! QR payload construction and matching.
//!
//! A freshly issued code renders as
//! `{base}?size=150x150&data=<kind>:<nonce>`. Scanning the rendered image
//! yields the `data` part, while copying the link yields the whole URL; both
//! are accepted. Older clients send `base64("<json>|<timestamp>")` where the
//! JSON carries `sessionType`. None of these forms are authenticated: the
//! nonce identifies a code, it does not sign it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use url::Url;

use crate::models::session_kind::SessionKind;

const NONCE_LEN: usize = 32;

/// Builds the embeddable payload for a code of `kind` identified by `nonce`.
pub fn build(base_url: &str, kind: SessionKind, nonce: &str) -> String {
    let data = format!("{}:{}", kind.as_str(), nonce);
    let encoded: String = url::form_urlencoded::byte_serialize(data.as_bytes()).collect();
    format!("{base_url}?size=150x150&data={encoded}")
}

/// Legacy client payload after base64 decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyPayload {
    pub session_type: String,
    pub nonce: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyBody {
    session_type: String,
    #[serde(default)]
    nonce: Option<String>,
}

/// Decodes `base64("<json>|<timestamp>")`. The timestamp part is optional.
pub fn decode_legacy(raw: &str) -> Option<LegacyPayload> {
    let bytes = STANDARD.decode(raw.trim()).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    let (json, timestamp) = match decoded.split_once('|') {
        Some((json, ts)) => (json, ts.trim().parse::<i64>().ok()),
        None => (decoded.as_str(), None),
    };
    let body: LegacyBody = serde_json::from_str(json).ok()?;
    Some(LegacyPayload {
        session_type: body.session_type,
        nonce: body.nonce,
        timestamp,
    })
}

/// The `data` query parameter when `raw` is a URL, otherwise `raw` itself.
fn data_part(raw: &str) -> String {
    Url::parse(raw.trim())
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "data")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_else(|| raw.trim().to_string())
}

fn looks_like_nonce(s: &str) -> bool {
    s.len() == NONCE_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Extracts the code nonce a payload refers to, if it carries one.
pub fn extract_nonce(raw: &str) -> Option<String> {
    let data = data_part(raw);
    if let Some((kind, nonce)) = data.split_once(':') {
        if kind.parse::<SessionKind>().is_ok() && looks_like_nonce(nonce) {
            return Some(nonce.to_ascii_lowercase());
        }
    }
    decode_legacy(raw)
        .and_then(|l| l.nonce)
        .filter(|n| looks_like_nonce(n))
        .map(|n| n.to_ascii_lowercase())
}

/// `true` when the payload names `kind`: either it textually contains the
/// kind string, or it decodes as a legacy payload with a matching `sessionType`.
pub fn matches_kind(raw: &str, kind: SessionKind) -> bool {
    if raw.contains(kind.as_str()) {
        return true;
    }
    decode_legacy(raw).is_some_and(|l| l.session_type == kind.as_str())
}
