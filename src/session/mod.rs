//! Bearer credential storage and the user projected from it.

mod claims;
mod permissions;
mod token;

pub use claims::{decode, UserInfo};
pub use permissions::{has_permission, has_role, Permission};
pub use token::{MemoryTokenStore, NoopTokenStore, SqliteTokenStore, TokenStore, TOKEN_KEY};

/// Read-only view of the signed-in user.
pub struct Session;

impl Session {
  /// Recomputed from the store on every call; clearing the store ends the
  /// session.
  pub fn current(store: &dyn TokenStore) -> Option<UserInfo> {
    store.get().as_deref().and_then(decode)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use base64::engine::general_purpose::URL_SAFE_NO_PAD;
  use base64::Engine;

  #[test]
  fn test_session_follows_the_store() {
    let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"kho01","roles":["STAFF"]}"#);
    let store = MemoryTokenStore::with_token(&format!("h.{}.s", payload));

    let user = Session::current(&store).unwrap();
    assert_eq!(user.username, "kho01");
    assert!(has_permission(&user.roles, Permission::ImportCreate));

    store.clear().unwrap();
    assert_eq!(Session::current(&store), None);
  }

  #[test]
  fn test_malformed_token_is_no_session() {
    let store = MemoryTokenStore::with_token("abc.def");
    assert_eq!(Session::current(&store), None);
    assert!(store.is_logged_in());
  }
}
