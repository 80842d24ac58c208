//! Mapper configuration.

/// What to do when an entity declares no key properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Fail with a configuration error.
    #[default]
    Strict,
    /// Fall back to a single key property named `id`, logging a warning the
    /// first time the fallback is used for a type.
    ImplicitId,
}

/// Configuration for one mapping session.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Handling of entities without declared keys.
    pub key_policy: KeyPolicy,
    /// Match column labels case-insensitively (labels and lookups are
    /// lower-cased). Most drivers report labels in the case the query used,
    /// so this is on by default.
    pub lowercase_labels: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            key_policy: KeyPolicy::Strict,
            lowercase_labels: true,
        }
    }
}

impl MapperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key policy.
    pub fn key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }

    /// Enable or disable case-insensitive label matching.
    pub fn lowercase_labels(mut self, enabled: bool) -> Self {
        self.lowercase_labels = enabled;
        self
    }

    /// Normalize a label or column name for lookup.
    pub(crate) fn normalize(&self, label: &str) -> String {
        if self.lowercase_labels {
            label.to_lowercase()
        } else {
            label.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_and_case_insensitive() {
        let config = MapperConfig::default();
        assert_eq!(config.key_policy, KeyPolicy::Strict);
        assert!(config.lowercase_labels);
        assert_eq!(config.normalize("User_ID"), "user_id");
    }

    #[test]
    fn builder() {
        let config = MapperConfig::new()
            .key_policy(KeyPolicy::ImplicitId)
            .lowercase_labels(false);
        assert_eq!(config.key_policy, KeyPolicy::ImplicitId);
        assert_eq!(config.normalize("User_ID"), "User_ID");
    }
}
