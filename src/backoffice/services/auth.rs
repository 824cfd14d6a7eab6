use crate::backoffice::client::ApiClient;
use crate::backoffice::types::{LoginRequest, LoginResponse, UpdateProfileRequest, UserProfile};
use crate::error::ServiceError;

const LOGIN: &str = "/api/auth/login";
const PROFILE: &str = "/api/auth/profile";

#[derive(Debug, Clone)]
pub struct AuthService {
  api: ApiClient,
}

impl AuthService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  /// Exchange credentials for a bearer token. Storing it is up to the caller.
  pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ServiceError> {
    let request = LoginRequest {
      username: username.to_string(),
      password: password.to_string(),
    };
    let response: LoginResponse = self.api.post(LOGIN).body(&request).data().await?;
    if response.token.is_empty() {
      return Err(ServiceError::InvalidResponse {
        message: "login response carries no token".to_string(),
      });
    }
    Ok(response)
  }

  pub async fn profile(&self) -> Result<UserProfile, ServiceError> {
    self.api.get(PROFILE).data().await
  }

  pub async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<UserProfile, ServiceError> {
    self.api.put(PROFILE).body(request).data().await
  }
}
