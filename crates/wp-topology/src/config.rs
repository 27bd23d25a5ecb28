//! Deployment configuration
//!
//! A flat record of named string fields. Every field has a fallback so an
//! empty environment still yields a buildable (non-production) graph.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variable names, in declaration order.
pub const CONFIG_KEYS: [&str; 8] = [
    "REGION",
    "ACCOUNT",
    "VPC",
    "DOMAIN",
    "DOMAIN_WILDCARD",
    "DATABASE_INSTANCE",
    "DATABASE_NAME",
    "DATABASE_USER",
];

/// Immutable input to the topology builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub region: String,
    pub account: String,
    pub vpc_name: String,
    pub domain: String,
    pub domain_wildcard: String,
    pub database_instance: String,
    pub database_name: String,
    pub database_user: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            region: defaults::DEFAULT_REGION.to_string(),
            account: defaults::DEFAULT_ACCOUNT.to_string(),
            vpc_name: defaults::DEFAULT_VPC_NAME.to_string(),
            domain: defaults::DEFAULT_DOMAIN.to_string(),
            domain_wildcard: defaults::DEFAULT_DOMAIN_WILDCARD.to_string(),
            database_instance: defaults::DEFAULT_DATABASE_INSTANCE.to_string(),
            database_name: defaults::DEFAULT_DATABASE_NAME.to_string(),
            database_user: defaults::DEFAULT_DATABASE_USER.to_string(),
        }
    }
}

impl DeploymentConfig {
    /// Build from `(name, value)` pairs.
    ///
    /// Unknown names are ignored. A missing or empty value keeps the default,
    /// so `DOMAIN=""` behaves exactly like an unset `DOMAIN`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            let value: String = value.into();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "REGION" => &mut config.region,
                "ACCOUNT" => &mut config.account,
                "VPC" => &mut config.vpc_name,
                "DOMAIN" => &mut config.domain,
                "DOMAIN_WILDCARD" => &mut config.domain_wildcard,
                "DATABASE_INSTANCE" => &mut config.database_instance,
                "DATABASE_NAME" => &mut config.database_name,
                "DATABASE_USER" => &mut config.database_user,
                _ => continue,
            };
            *slot = value;
        }
        config
    }

    /// Build from a flat mapping of named fields.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        Self::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    /// Read the recognised variables from the process environment.
    ///
    /// Loading a `.env` file is left to the caller.
    pub fn from_env() -> Self {
        Self::from_pairs(
            CONFIG_KEYS
                .iter()
                .filter_map(|key| std::env::var(key).ok().map(|value| (*key, value))),
        )
    }

    /// Subject alternative name requested alongside the primary domain.
    ///
    /// An explicit `DOMAIN_WILDCARD` wins; otherwise `*.<domain>` is derived.
    /// Returns `None` when neither is available.
    pub fn wildcard_domain(&self) -> Option<String> {
        if !self.domain_wildcard.is_empty() {
            Some(self.domain_wildcard.clone())
        } else if !self.domain.is_empty() {
            Some(format!("*.{}", self.domain))
        } else {
            None
        }
    }

    /// Flatten back into the environment-variable form.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let values = [
            &self.region,
            &self.account,
            &self.vpc_name,
            &self.domain,
            &self.domain_wildcard,
            &self.database_instance,
            &self.database_name,
            &self.database_user,
        ];
        CONFIG_KEYS
            .iter()
            .zip(values)
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_match_loader_fallbacks() {
        let config = DeploymentConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.account, "");
        assert_eq!(config.vpc_name, "Vpc");
        assert_eq!(config.database_instance, "db");
        assert_eq!(config.database_name, "db");
        assert_eq!(config.database_user, "admin");
    }

    #[test]
    fn test_from_pairs_overrides_known_keys() {
        let config = DeploymentConfig::from_pairs([
            ("DOMAIN", "example.com"),
            ("DATABASE_NAME", "wp"),
            ("UNRELATED", "ignored"),
        ]);
        assert_eq!(config.domain, "example.com");
        assert_eq!(config.database_name, "wp");
        assert_eq!(config.database_user, "admin");
    }

    #[test]
    fn test_empty_value_keeps_default() {
        let config = DeploymentConfig::from_pairs([("REGION", ""), ("VPC", "")]);
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.vpc_name, "Vpc");
    }

    #[test]
    fn test_wildcard_domain_derivation() {
        let mut config = DeploymentConfig::from_pairs([("DOMAIN", "example.com")]);
        assert_eq!(config.wildcard_domain().as_deref(), Some("*.example.com"));

        config.domain_wildcard = "*.cdn.example.com".into();
        assert_eq!(config.wildcard_domain().as_deref(), Some("*.cdn.example.com"));

        assert_eq!(DeploymentConfig::default().wildcard_domain(), None);
    }

    #[test]
    fn test_map_round_trip_preserves_fields() {
        let config = DeploymentConfig::from_pairs([
            ("DOMAIN", "example.com"),
            ("ACCOUNT", "123456789012"),
        ]);
        assert_eq!(DeploymentConfig::from_map(&config.to_map()), config);
    }

    proptest! {
        #[test]
        fn prop_non_empty_values_always_win(value in "[a-z0-9.-]{1,24}") {
            let config = DeploymentConfig::from_pairs([("DATABASE_USER", value.clone())]);
            prop_assert_eq!(config.database_user, value);
            prop_assert_eq!(config.database_name, "db");
        }
    }
}
