//! Credential decoding.
//!
//! Access and refresh credentials are JWT-shaped strings
//! (`header.payload.signature`). Only the payload is read here; signature
//! verification is the server's job. Every function degrades to `None`/`false`
//! on malformed input instead of returning an error.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity claims carried in an access credential's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Any other claims the server chose to embed.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Name to show for the signed-in user
    pub fn display_name(&self) -> String {
        if let Some(ref name) = self.username {
            return name.clone();
        }
        if let Some(ref email) = self.email {
            return email.clone();
        }
        match self.user_id {
            Some(id) => format!("user #{}", id),
            None => "unknown user".to_string(),
        }
    }

    /// True when `exp` is strictly after `now`
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.exp > now.timestamp()
    }
}

/// Decode the payload segment of a credential into claims.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (_header, payload) = (parts.next()?, parts.next()?);
    if payload.is_empty() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .or_else(|_| {
            // Some issuers emit standard alphabet with padding
            let padded = match payload.len() % 4 {
                2 => format!("{}==", payload),
                3 => format!("{}=", payload),
                _ => payload.to_string(),
            };
            STANDARD.decode(padded)
        })
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}

/// Whether the credential decodes and has not expired as of `now`.
pub fn is_valid_at(token: &str, now: DateTime<Utc>) -> bool {
    decode_claims(token)
        .map(|claims| claims.is_live_at(now))
        .unwrap_or(false)
}

pub fn is_valid(token: &str) -> bool {
    is_valid_at(token, Utc::now())
}

/// Build an unsigned credential carrying `claims`. Test helper.
#[cfg(test)]
pub(crate) fn encode_unsigned(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn token_expiring_in(secs: i64) -> String {
        let exp = (Utc::now() + Duration::seconds(secs)).timestamp();
        encode_unsigned(&json!({ "exp": exp, "user_id": 7, "username": "ana" }))
    }

    #[test]
    fn test_future_expiry_is_valid() {
        assert!(is_valid(&token_expiring_in(600)));
    }

    #[test]
    fn test_past_expiry_is_invalid() {
        assert!(!is_valid(&token_expiring_in(-600)));
    }

    #[test]
    fn test_expiry_at_now_is_invalid() {
        let now = Utc::now();
        let token = encode_unsigned(&json!({ "exp": now.timestamp() }));
        assert!(!is_valid_at(&token, now));
        assert!(is_valid_at(&token, now - Duration::seconds(1)));
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        // `e30` is `{}`, which has no `exp`
        for bad in ["", "abc", "a.b.c", "...", "a.!!!.c", "x.e30.y"] {
            assert!(!is_valid(bad), "{:?} should be invalid", bad);
            assert!(decode_claims(bad).is_none(), "{:?} should not decode", bad);
        }
    }

    #[test]
    fn test_decode_keeps_extra_claims() {
        let token = encode_unsigned(&json!({
            "exp": 4102444800i64,
            "user_id": 3,
            "username": "caja1",
            "token_type": "access",
            "jti": "abc"
        }));
        let claims = decode_claims(&token).expect("claims");
        assert_eq!(claims.user_id, Some(3));
        assert_eq!(claims.username.as_deref(), Some("caja1"));
        assert_eq!(claims.extra.get("token_type"), Some(&json!("access")));
        assert_eq!(claims.extra.get("jti"), Some(&json!("abc")));
        assert_eq!(claims.display_name(), "caja1");
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        let payload = STANDARD.encode(r#"{"exp":4102444800}"#);
        let token = format!("h.{}.s", payload);
        assert_eq!(decode_claims(&token).map(|c| c.exp), Some(4102444800));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut claims = decode_claims(&encode_unsigned(&json!({ "exp": 1, "user_id": 9 })))
            .expect("claims");
        assert_eq!(claims.display_name(), "user #9");
        claims.email = Some("a@b.c".to_string());
        assert_eq!(claims.display_name(), "a@b.c");
    }
}
