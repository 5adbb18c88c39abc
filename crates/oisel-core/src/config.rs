//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial capacity of range lists handed out by the pooled factory.
    pub range_list_capacity: usize,

    /// Number of range lists the pool keeps across `reset()`.
    pub range_pool_max_retained: usize,

    /// Reject row×channel cells whose FLAG is set when building 2D data masks.
    pub skip_flagged: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            range_list_capacity: 16,
            range_pool_max_retained: 64,
            skip_flagged: false,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `OISEL_RANGE_LIST_CAPACITY`: initial capacity of pooled range lists
    /// - `OISEL_RANGE_POOL_MAX_RETAINED`: lists kept by the pool on reset
    /// - `OISEL_SKIP_FLAGGED`: `true`/`1` to drop flagged cells from 2D masks
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("OISEL_RANGE_LIST_CAPACITY") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.range_list_capacity = v;
            }
        }

        if let Ok(s) = std::env::var("OISEL_RANGE_POOL_MAX_RETAINED") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.range_pool_max_retained = v;
            }
        }

        if let Ok(s) = std::env::var("OISEL_SKIP_FLAGGED") {
            if let Some(v) = parse_flag(&s) {
                cfg.skip_flagged = v;
            }
        }

        cfg
    }

    /// Reject configurations the pool cannot honour.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.range_list_capacity > 1 << 24 {
            return Err(crate::error::Error::Config(format!(
                "range_list_capacity {} is unreasonably large",
                self.range_list_capacity
            )));
        }
        Ok(())
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_roundtrip_json() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"skip_flagged": true}"#).unwrap();
        assert!(cfg.skip_flagged);
        assert_eq!(cfg.range_list_capacity, 16);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_validate_rejects_huge_lists() {
        let cfg = EngineConfig {
            range_list_capacity: usize::MAX,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }
}
