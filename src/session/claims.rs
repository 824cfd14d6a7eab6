//! Display-only decoding of the bearer credential payload.
//!
//! The signature is never checked; the backend verifies tokens. A token
//! that cannot be decoded yields no user instead of an error.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// base64url with or without padding. Standard-alphabet input is mapped
/// onto it before decoding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
  &alphabet::URL_SAFE,
  GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// User projected from a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
  pub username: String,
  pub roles: Vec<String>,
  pub full_name: String,
  pub email: String,
  pub expires_at: Option<DateTime<Utc>>,
}

impl UserInfo {
  /// Tokens without `exp` never expire here.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.is_some_and(|at| at <= now)
  }
}

/// Decode `header.payload.signature` into a [`UserInfo`].
///
/// Claims are picked one by one, so a claim of an unexpected type is
/// skipped rather than failing the whole payload.
pub fn decode(token: &str) -> Option<UserInfo> {
  let parts: Vec<&str> = token.split('.').collect();
  if parts.len() != 3 {
    debug!(segments = parts.len(), "token is not a three-segment credential");
    return None;
  }

  let normalized = parts[1].replace('+', "-").replace('/', "_");
  let bytes = match PAYLOAD_ENGINE.decode(normalized.as_bytes()) {
    Ok(bytes) => bytes,
    Err(err) => {
      debug!(error = %err, "token payload is not base64");
      return None;
    }
  };
  let claims = match serde_json::from_slice::<Value>(&bytes) {
    Ok(Value::Object(claims)) => claims,
    Ok(_) => {
      debug!("token payload is not a JSON object");
      return None;
    }
    Err(err) => {
      debug!(error = %err, "token payload is not JSON");
      return None;
    }
  };

  Some(into_user(&claims))
}

fn into_user(claims: &Map<String, Value>) -> UserInfo {
  let sub = text(claims, "sub");
  let username = sub.clone().or_else(|| text(claims, "username")).unwrap_or_default();
  let full_name = text(claims, "fullName")
    .or_else(|| text(claims, "name"))
    .or_else(|| sub.clone())
    .unwrap_or_default();
  let email = text(claims, "email").or(sub).unwrap_or_default();
  let roles = role_names(claims.get("roles"))
    .or_else(|| role_names(claims.get("authorities")))
    .unwrap_or_default();
  let expires_at = claims
    .get("exp")
    .and_then(|exp| match exp {
      Value::Number(n) => n.as_f64(),
      Value::String(s) => s.trim().parse::<f64>().ok(),
      _ => None,
    })
    .filter(|exp| exp.is_finite())
    .and_then(|exp| DateTime::from_timestamp(exp as i64, 0));

  UserInfo {
    username,
    roles,
    full_name,
    email,
    expires_at,
  }
}

/// Non-empty string claim. Numeric claims such as a numeric `sub` are
/// rendered as text.
fn text(claims: &Map<String, Value>, name: &str) -> Option<String> {
  match claims.get(name)? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Role names from an array of names or of Spring-style
/// `{"authority": "ADMIN"}` objects, or from one comma-separated string.
/// Entries of any other shape are dropped.
fn role_names(value: Option<&Value>) -> Option<Vec<String>> {
  match value? {
    Value::String(s) => Some(
      s.split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(String::from)
        .collect(),
    ),
    Value::Array(items) => Some(
      items
        .iter()
        .filter_map(|item| match item {
          Value::String(name) => Some(name.clone()),
          Value::Object(role) => role.get("authority").and_then(Value::as_str).map(String::from),
          _ => None,
        })
        .collect(),
    ),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
  use serde_json::json;

  fn token(payload: serde_json::Value) -> String {
    format!(
      "eyJhbGciOiJIUzI1NiJ9.{}.signature",
      URL_SAFE_NO_PAD.encode(payload.to_string())
    )
  }

  #[test]
  fn test_two_segments_yield_no_user() {
    assert_eq!(decode("abc.def"), None);
  }

  #[test]
  fn test_garbage_payload_yields_no_user() {
    assert_eq!(decode("a.!!!.c"), None);
    let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("not json"));
    assert_eq!(decode(&not_json), None);
    assert_eq!(decode(""), None);
  }

  #[test]
  fn test_subject_fills_missing_fields() {
    let user = decode(&token(json!({"sub": "kho01", "roles": ["STAFF"]}))).unwrap();
    assert_eq!(user.username, "kho01");
    assert_eq!(user.full_name, "kho01");
    assert_eq!(user.email, "kho01");
    assert_eq!(user.roles, vec!["STAFF".to_string()]);
    assert_eq!(user.expires_at, None);
  }

  #[test]
  fn test_alternate_claim_names() {
    let user = decode(&token(json!({
      "username": "manager",
      "authorities": [{"authority": "MANAGER"}, "USER"],
      "name": "Nguyễn Văn A",
      "email": "a@example.com",
    })))
    .unwrap();
    assert_eq!(user.username, "manager");
    assert_eq!(user.roles, vec!["MANAGER".to_string(), "USER".to_string()]);
    assert_eq!(user.full_name, "Nguyễn Văn A");
    assert_eq!(user.email, "a@example.com");
  }

  #[test]
  fn test_empty_claims_fall_through() {
    let user = decode(&token(json!({"sub": "", "username": "u", "fullName": ""}))).unwrap();
    assert_eq!(user.username, "u");
    assert_eq!(user.full_name, "");
    assert!(user.roles.is_empty());
  }

  #[test]
  fn test_standard_alphabet_with_padding_is_accepted() {
    let payload = STANDARD.encode(json!({"sub": "admin", "roles": ["ADMIN"]}).to_string());
    let user = decode(&format!("h.{}.s", payload)).unwrap();
    assert_eq!(user.username, "admin");
  }

  #[test]
  fn test_numeric_subject_is_read_as_text() {
    let user = decode(&token(json!({"sub": 42, "roles": ["USER"]}))).unwrap();
    assert_eq!(user.username, "42");
    assert_eq!(user.email, "42");
    assert_eq!(user.roles, vec!["USER".to_string()]);
  }

  #[test]
  fn test_single_string_role() {
    let user = decode(&token(json!({"sub": "kho01", "roles": "STAFF"}))).unwrap();
    assert_eq!(user.roles, vec!["STAFF".to_string()]);

    let user = decode(&token(json!({"sub": "kho01", "authorities": "MANAGER, USER"}))).unwrap();
    assert_eq!(user.roles, vec!["MANAGER".to_string(), "USER".to_string()]);
  }

  #[test]
  fn test_mistyped_claims_are_skipped() {
    let user = decode(&token(json!({
      "sub": "admin",
      "roles": ["ADMIN", 7, {"name": "X"}],
      "email": {"primary": "a@example.com"},
      "exp": "soon",
    })))
    .unwrap();
    assert_eq!(user.username, "admin");
    assert_eq!(user.roles, vec!["ADMIN".to_string()]);
    assert_eq!(user.email, "admin");
    assert_eq!(user.expires_at, None);
  }

  #[test]
  fn test_non_object_payload_yields_no_user() {
    let array = format!("a.{}.c", URL_SAFE_NO_PAD.encode("[1,2]"));
    assert_eq!(decode(&array), None);
  }

  #[test]
  fn test_expiry_from_exp_claim() {
    let user = decode(&token(json!({"sub": "u", "exp": 1_700_000_000}))).unwrap();
    let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    assert_eq!(user.expires_at, Some(at));
    assert!(user.is_expired(at));
    assert!(!user.is_expired(at - chrono::Duration::seconds(1)));
  }
}
