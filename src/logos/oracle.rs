//! 🔮 Oracle - free-form consultation personalised by the seeker profile
//!
//! Placeholder responder until a real language model is plugged in
//! through the same `ChoiceSource`/profile seams.

use std::sync::Arc;
use tracing::debug;

use super::profile::ProfileProvider;
use super::selector::{choose, ChoiceSource};
use crate::error::{EngineError, EngineResult};

const RESPONSES: &[&str] = &[
    "I sense your purpose is {purpose}. Let me guide you...",
    "Your offering of {offering} shows great wisdom, {name}.",
    "The path you seek is not an easy one, but I shall help you find it.",
    "Your question resonates with the ancient wisdom. Let me share what I see...",
    "The stars align with your purpose. The answer lies within your offering.",
];

pub struct Oracle {
    profile: Arc<dyn ProfileProvider>,
    choice: Arc<dyn ChoiceSource>,
}

impl Oracle {
    pub fn new(profile: Arc<dyn ProfileProvider>, choice: Arc<dyn ChoiceSource>) -> Self {
        Self { profile, choice }
    }

    /// Ready once a profile exists
    pub fn is_ready(&self) -> bool {
        matches!(self.profile.profile(), Ok(Some(_)))
    }

    pub fn consult(&self, query: &str) -> EngineResult<String> {
        let profile = self.profile.require_profile()?;
        if query.trim().is_empty() {
            return Err(EngineError::EmptyResponse);
        }

        debug!("Oracle consulted by {}: {}", profile.name, query);
        let template = choose(self.choice.as_ref(), RESPONSES)
            .copied()
            .unwrap_or("I am still learning to understand your questions.");
        Ok(profile.personalize(template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logos::profile::UserProfile;
    use crate::logos::selector::FixedChoice;

    #[test]
    fn test_consult_personalizes() {
        let oracle = Oracle::new(
            Arc::new(UserProfile::new("Mira", "healing", "patience")),
            Arc::new(FixedChoice(1)),
        );
        assert!(oracle.is_ready());
        assert_eq!(
            oracle.consult("What is my purpose?").unwrap(),
            "Your offering of patience shows great wisdom, Mira."
        );
    }

    #[test]
    fn test_consult_requires_profile() {
        let oracle = Oracle::new(Arc::new(None::<UserProfile>), Arc::new(FixedChoice(0)));
        assert!(!oracle.is_ready());
        assert!(matches!(
            oracle.consult("Anyone there?"),
            Err(EngineError::ProfileNotInitialized)
        ));
    }
}
