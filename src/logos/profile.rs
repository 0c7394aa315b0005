//! Seeker profile - name, purpose and offering used to personalise text
//!
//! Read-only from the engine's point of view; the profile is written once
//! during onboarding and stored as an opaque record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::totems::vault::PROFILE_KEY;
use crate::totems::Vault;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub purpose: String,
    pub offering: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(name: &str, purpose: &str, offering: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            purpose: purpose.trim().to_string(),
            offering: offering.trim().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.purpose.is_empty() && !self.offering.is_empty()
    }

    /// Fills `{name}`, `{purpose}` and `{offering}` placeholders
    pub fn personalize(&self, template: &str) -> String {
        template
            .replace("{name}", &self.name)
            .replace("{purpose}", &self.purpose)
            .replace("{offering}", &self.offering)
    }
}

pub trait ProfileProvider: Send + Sync {
    fn profile(&self) -> EngineResult<Option<UserProfile>>;

    /// Profile or `ProfileNotInitialized`
    fn require_profile(&self) -> EngineResult<UserProfile> {
        self.profile()?.ok_or(EngineError::ProfileNotInitialized)
    }
}

impl ProfileProvider for UserProfile {
    fn profile(&self) -> EngineResult<Option<UserProfile>> {
        Ok(Some(self.clone()))
    }
}

impl ProfileProvider for Option<UserProfile> {
    fn profile(&self) -> EngineResult<Option<UserProfile>> {
        Ok(self.clone())
    }
}

/// Profile stored in the vault under the `profile` key
#[derive(Clone)]
pub struct StoredProfile {
    vault: Vault,
}

impl StoredProfile {
    pub fn new(vault: Vault) -> Self {
        Self { vault }
    }

    /// Onboarding write; incomplete profiles are rejected
    pub fn store(&self, profile: &UserProfile) -> EngineResult<()> {
        if !profile.is_complete() {
            return Err(EngineError::ProfileNotInitialized);
        }
        self.vault
            .save(PROFILE_KEY, profile)
            .map_err(|e| EngineError::persistence(PROFILE_KEY, e))
    }
}

impl ProfileProvider for StoredProfile {
    fn profile(&self) -> EngineResult<Option<UserProfile>> {
        self.vault
            .load(PROFILE_KEY)
            .map_err(|e| EngineError::persistence(PROFILE_KEY, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totems::MemoryStorage;
    use std::sync::Arc;

    #[test]
    fn test_personalize_fills_placeholders() {
        let profile = UserProfile::new("Mira", "healing", "patience");
        assert_eq!(
            profile.personalize("{name} seeks {purpose} and offers {offering}."),
            "Mira seeks healing and offers patience."
        );
    }

    #[test]
    fn test_stored_profile_round_trip() {
        let stored = StoredProfile::new(Vault::new(Arc::new(MemoryStorage::new())));
        assert!(matches!(
            stored.require_profile(),
            Err(EngineError::ProfileNotInitialized)
        ));

        let profile = UserProfile::new(" Mira ", "healing", "patience");
        stored.store(&profile).unwrap();
        assert_eq!(stored.require_profile().unwrap(), profile);
        assert_eq!(profile.name, "Mira");
    }

    #[test]
    fn test_incomplete_profile_rejected() {
        let stored = StoredProfile::new(Vault::new(Arc::new(MemoryStorage::new())));
        let profile = UserProfile::new("Mira", "", "patience");
        assert!(stored.store(&profile).is_err());
        assert!(stored.profile().unwrap().is_none());
    }
}
