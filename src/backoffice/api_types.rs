//! Serde-deserializable wrappers matching the gateway's response shapes.
//!
//! Domain payloads live in [`super::types`]; this module only knows the
//! transport envelope and the error body.

use serde::Deserialize;

use crate::error::ServiceError;

/// Uniform wrapper `{success, message, data}` around gateway payloads.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  #[serde(default)]
  pub success: Option<bool>,
  #[serde(default)]
  pub message: Option<String>,
  pub data: Option<T>,
}

impl<T> Envelope<T> {
  /// `success: false` is a rejection even on a 2xx response. A missing
  /// `success` flag counts as success.
  pub fn into_result(self) -> Result<T, ServiceError> {
    self.check()?;
    self.data.ok_or_else(|| ServiceError::InvalidResponse {
      message: "response envelope carries no data".to_string(),
    })
  }

  pub fn check(&self) -> Result<(), ServiceError> {
    if self.success == Some(false) {
      return Err(ServiceError::Envelope {
        message: self
          .message
          .clone()
          .filter(|m| !m.is_empty())
          .unwrap_or_else(|| "request was not successful".to_string()),
      });
    }
    Ok(())
  }
}

/// Body of a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
  #[serde(default)]
  pub message: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unwraps_data() {
    let envelope: Envelope<Vec<u32>> =
      serde_json::from_str(r#"{"success":true,"message":null,"data":[1,2]}"#).unwrap();
    assert_eq!(envelope.into_result().unwrap(), vec![1, 2]);
  }

  #[test]
  fn test_missing_success_flag_is_success() {
    let envelope: Envelope<u32> = serde_json::from_str(r#"{"data":7}"#).unwrap();
    assert_eq!(envelope.into_result().unwrap(), 7);
  }

  #[test]
  fn test_rejection_surfaces_message() {
    let envelope: Envelope<u32> =
      serde_json::from_str(r#"{"success":false,"message":"Phiếu đã bị hủy","data":null}"#).unwrap();
    assert_eq!(
      envelope.into_result(),
      Err(ServiceError::Envelope {
        message: "Phiếu đã bị hủy".to_string()
      })
    );
  }

  #[test]
  fn test_null_data_is_invalid() {
    let envelope: Envelope<u32> = serde_json::from_str(r#"{"success":true,"data":null}"#).unwrap();
    assert!(matches!(
      envelope.into_result(),
      Err(ServiceError::InvalidResponse { .. })
    ));
  }
}
