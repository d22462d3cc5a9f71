//! API credentials for the sandbox and agent backends.

use std::fmt;

/// A secret API key.
///
/// `Debug` and `Display` never print the key itself, so credentials can sit
/// inside structs that get logged.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Credential(String);

impl Credential {
    /// Wraps a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Parses an optional environment value, treating blank values as absent.
    pub fn from_env_value(value: Option<String>) -> Option<Self> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self)
    }

    /// Returns the raw key for handing to a backend.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_key() {
        let credential = Credential::new("sk-secret");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.to_string(), "***");
        assert_eq!(credential.expose(), "sk-secret");
    }

    #[test]
    fn test_from_env_value_blank_is_absent() {
        assert!(Credential::from_env_value(None).is_none());
        assert!(Credential::from_env_value(Some(String::new())).is_none());
        assert!(Credential::from_env_value(Some("   ".to_string())).is_none());
        assert_eq!(
            Credential::from_env_value(Some(" key \n".to_string())),
            Some(Credential::new("key"))
        );
    }
}
