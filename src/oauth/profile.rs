use serde::{Deserialize, Serialize};

/// Named provider profile, as written in config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileKind {
    /// Forces a fresh consent screen whenever `offline_access` is requested.
    #[default]
    #[serde(alias = "openstack", alias = "openstackid")]
    Standard,
    /// No extra authorization parameters, for servers that reject
    /// `approval_prompt`.
    Plain,
}

/// Provider-specific authorization URL rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub name: &'static str,
    /// Scope whose presence triggers `consent_params`.
    pub consent_scope: Option<&'static str>,
    /// Extra query parameters forcing a fresh consent screen.
    pub consent_params: &'static [(&'static str, &'static str)],
}

impl ProviderProfile {
    /// Servers only issue a new refresh token for `offline_access` when
    /// consent is forced on every authorization.
    pub const STANDARD: ProviderProfile = ProviderProfile {
        name: "standard",
        consent_scope: Some("offline_access"),
        consent_params: &[("prompt", "consent"), ("approval_prompt", "force")],
    };

    pub const PLAIN: ProviderProfile = ProviderProfile {
        name: "plain",
        consent_scope: None,
        consent_params: &[],
    };

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Standard => Self::STANDARD,
            ProfileKind::Plain => Self::PLAIN,
        }
    }

    /// Extra authorization query parameters for the requested scopes.
    pub fn extra_params(&self, scopes: &[String]) -> &'static [(&'static str, &'static str)] {
        match self.consent_scope {
            Some(trigger) if scopes.iter().any(|s| s == trigger) => self.consent_params,
            _ => &[],
        }
    }
}

impl From<ProfileKind> for ProviderProfile {
    fn from(kind: ProfileKind) -> Self {
        Self::for_kind(kind)
    }
}
