use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::llm_client::{ApiFlavor, LlmSettings, DEFAULT_API_VERSION};
use crate::pipeline::policy::JoinPolicy;

/// Credentials file the service has always been deployed with.
const CREDENTIALS_FILE: &str = "azureopenaiapikey.env";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_base: String,
    pub openai_api_key: String,
    pub openai_api_type: ApiFlavor,
    pub openai_api_version: String,
    pub llm_timeout: Duration,
    pub example_products_csv: PathBuf,
    pub example_attributes_csv: PathBuf,
    pub join_policy: JoinPolicy,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load credential files if present; ignore if missing
        dotenvy::from_filename(CREDENTIALS_FILE).ok();
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            openai_api_base: require("OPENAI_API_BASE")?,
            openai_api_key: require("OPENAI_API_KEY")?,
            openai_api_type: parse_setting("OPENAI_API_TYPE", &or_default("OPENAI_API_TYPE", "azure"))?,
            openai_api_version: or_default("OPENAI_API_VERSION", DEFAULT_API_VERSION),
            llm_timeout: Duration::from_secs(
                or_default("LLM_TIMEOUT_SECS", "120")
                    .parse::<u64>()
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            example_products_csv: PathBuf::from(or_default(
                "EXAMPLE_PRODUCTS_CSV",
                "data/product_description_examples.csv",
            )),
            example_attributes_csv: PathBuf::from(or_default(
                "EXAMPLE_ATTRIBUTES_CSV",
                "data/product_description_examples_attributes.csv",
            )),
            join_policy: JoinPolicy {
                product_match: parse_setting(
                    "PRODUCT_MATCH_POLICY",
                    &or_default("PRODUCT_MATCH_POLICY", "first"),
                )?,
                column_collision: parse_setting(
                    "COLUMN_COLLISION_POLICY",
                    &or_default("COLUMN_COLLISION_POLICY", "first"),
                )?,
                duplicate_attribute: parse_setting(
                    "DUPLICATE_ATTRIBUTE_POLICY",
                    &or_default("DUPLICATE_ATTRIBUTE_POLICY", "first"),
                )?,
            },
            max_upload_bytes: or_default("MAX_UPLOAD_BYTES", "26214400")
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            port: or_default("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_base: self.openai_api_base.clone(),
            api_key: self.openai_api_key.clone(),
            api_version: self.openai_api_version.clone(),
            flavor: self.openai_api_type,
            timeout: self.llm_timeout,
        }
    }
}

fn parse_setting<T: FromStr<Err = String>>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|e| anyhow!("{key}: {e}"))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "OPENAI_API_BASE" => Some("http://localhost:9".to_string()),
        "OPENAI_API_KEY" => Some("test-key".to_string()),
        _ => None,
    })
    .expect("minimal test config must load")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::pipeline::policy::{DuplicateAttributePolicy, ProductMatchPolicy};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_required_vars() {
        let config = test_config();
        assert_eq!(config.openai_api_type, ApiFlavor::Azure);
        assert_eq!(config.openai_api_version, DEFAULT_API_VERSION);
        assert_eq!(config.port, 8080);
        assert_eq!(config.llm_timeout, Duration::from_secs(120));
        assert_eq!(config.join_policy, JoinPolicy::default());
        assert_eq!(
            config.example_products_csv,
            PathBuf::from("data/product_description_examples.csv")
        );
    }

    #[test]
    fn test_missing_api_key_is_error() {
        let err = Config::from_lookup(lookup_from(&[("OPENAI_API_BASE", "http://x")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_blank_required_var_is_error() {
        let result = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_BASE", "  "),
            ("OPENAI_API_KEY", "k"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_policy_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_BASE", "http://x"),
            ("OPENAI_API_KEY", "k"),
            ("OPENAI_API_TYPE", "openai"),
            ("DUPLICATE_ATTRIBUTE_POLICY", "last"),
            ("PRODUCT_MATCH_POLICY", "unique"),
        ]))
        .unwrap();

        assert_eq!(config.openai_api_type, ApiFlavor::OpenAi);
        assert_eq!(
            config.join_policy.duplicate_attribute,
            DuplicateAttributePolicy::LastWins
        );
        assert_eq!(config.join_policy.product_match, ProductMatchPolicy::Unique);
    }

    #[test]
    fn test_invalid_policy_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_BASE", "http://x"),
            ("OPENAI_API_KEY", "k"),
            ("COLUMN_COLLISION_POLICY", "merge"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("COLUMN_COLLISION_POLICY"));
    }

    #[test]
    fn test_invalid_port() {
        let result = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_BASE", "http://x"),
            ("OPENAI_API_KEY", "k"),
            ("PORT", "99999"),
        ]));
        assert!(result.is_err());
    }
}
