use crate::settings::UserProfile;

/// Signed-in state supplied by the identity collaborator. Only used for the
/// greeting and avatar; no chat logic depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub signed_in: bool,
    pub display_name: Option<String>,
    pub avatar_path: Option<String>,
}

impl Identity {
    pub fn from_profile(profile: &UserProfile) -> Self {
        let name = profile.name.trim();
        Self {
            signed_in: profile.signed_in,
            display_name: (!name.is_empty()).then(|| name.to_string()),
            avatar_path: profile.avatar_path.clone(),
        }
    }

    pub fn greeting(&self) -> String {
        match (&self.display_name, self.signed_in) {
            (Some(name), true) => format!("Hello {name},"),
            _ => "Hello Dev,".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_uses_name_only_when_signed_in() {
        let profile = UserProfile {
            name: "Ada".into(),
            signed_in: true,
            avatar_path: None,
        };
        assert_eq!(Identity::from_profile(&profile).greeting(), "Hello Ada,");

        let signed_out = UserProfile {
            signed_in: false,
            ..profile
        };
        assert_eq!(Identity::from_profile(&signed_out).greeting(), "Hello Dev,");
        assert_eq!(Identity::default().greeting(), "Hello Dev,");
    }
}
