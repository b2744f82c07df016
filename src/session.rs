//! Authenticated session: token and user profile
//!
//! Restored from storage at startup, written on login and cleared on logout.
//! The HTTP API reads the token for every request.

use crate::api::types::UserProfile;
use crate::errors::ClientResult;
use crate::logger::{self, LogTag};
use crate::storage::{KeyValueStorage, MemoryStorage};
use parking_lot::RwLock;
use std::sync::Arc;

pub const TOKEN_KEY: &str = "auth_token";
pub const PROFILE_KEY: &str = "user_profile";

pub struct Session {
    storage: Arc<dyn KeyValueStorage>,
    token: RwLock<Option<String>>,
    profile: RwLock<Option<UserProfile>>,
}

impl Session {
    /// Load token and profile from storage
    ///
    /// An unreadable profile is dropped (logged) rather than failing startup.
    pub fn restore(storage: Arc<dyn KeyValueStorage>) -> ClientResult<Self> {
        let token = storage.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let profile = match storage.get(PROFILE_KEY)? {
            Some(raw) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    logger::warning(LogTag::Session, &format!("Discarding stored profile: {}", e));
                    None
                }
            },
            None => None,
        };

        if let Some(profile) = &profile {
            logger::info(LogTag::Session, &format!("Restored session for {}", profile.username));
        }

        Ok(Self {
            storage,
            token: RwLock::new(token),
            profile: RwLock::new(profile),
        })
    }

    /// Session with no persisted backing
    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            token: RwLock::new(None),
            profile: RwLock::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    pub fn login(&self, token: &str, profile: UserProfile) -> ClientResult<()> {
        self.storage.set(TOKEN_KEY, token)?;
        self.storage.set(PROFILE_KEY, &serde_json::to_string(&profile)?)?;

        logger::info(LogTag::Session, &format!("Logged in as {}", profile.username));
        *self.token.write() = Some(token.to_string());
        *self.profile.write() = Some(profile);
        Ok(())
    }

    pub fn logout(&self) -> ClientResult<()> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(PROFILE_KEY)?;
        *self.token.write() = None;
        *self.profile.write() = None;
        logger::info(LogTag::Session, "Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            username: "ops".to_string(),
            display_name: Some("Desk Operator".to_string()),
            role: "admin".to_string(),
        }
    }

    #[test]
    fn test_login_persists_and_restores() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());

        let session = Session::restore(storage.clone()).unwrap();
        assert!(!session.is_authenticated());
        session.login("tok-1", profile()).unwrap();

        let restored = Session::restore(storage).unwrap();
        assert_eq!(restored.token().as_deref(), Some("tok-1"));
        assert_eq!(restored.profile(), Some(profile()));
    }

    #[test]
    fn test_logout_clears_storage() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let session = Session::restore(storage.clone()).unwrap();
        session.login("tok-1", profile()).unwrap();
        session.logout().unwrap();

        assert_eq!(session.token(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(PROFILE_KEY).unwrap(), None);
    }

    #[test]
    fn test_bad_profile_is_dropped() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok-2").unwrap();
        storage.set(PROFILE_KEY, "not json").unwrap();

        let session = Session::restore(storage).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.profile(), None);
    }
}
