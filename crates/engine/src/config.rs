use serde::Deserialize;

use crate::error::CrosscheckError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine configuration. Read once at start, immutable for the run.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CrosscheckConfig {
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    /// Trailing colon-suffixes stripped during tag canonicalization.
    #[serde(default = "default_colon_suffixes")]
    pub colon_suffixes: Vec<String>,
    /// IO-type suffixes; at most one is stripped per tag, longest match wins.
    #[serde(default = "default_strip_suffixes")]
    pub strip_suffixes: Vec<String>,
    /// Prefixes marking EtherNet/IP device tags (E300 overloads, VFDs, ...).
    #[serde(default = "default_enet_prefixes")]
    pub enet_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifyConfig {
    /// Atomic datatypes that mark a TAG as program logic rather than IO.
    #[serde(default = "default_program_datatypes")]
    pub program_datatypes: Vec<String>,
}

fn default_colon_suffixes() -> Vec<String> {
    [":I1", ":O1", ":I", ":O", ":C", ":S"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_strip_suffixes() -> Vec<String> {
    [
        "_FailedToClose",
        "_FailedToOpen",
        "_OnTimer",
        "_OffTimer",
        "_Monitor",
        "_Failed",
        "_Pulse",
        "_Input",
        "_Out",
        "_Old",
        "_Pos",
        "_EV",
        "_MC",
        "_AUX",
        "_ZSO",
        "_ZSC",
        "_In",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_enet_prefixes() -> Vec<String> {
    ["E300_", "VFD_", "IPDev_", "IPDEV_"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_program_datatypes() -> Vec<String> {
    ["DINT", "INT", "SINT", "BOOL", "REAL", "TIMER", "COUNTER", "STRING"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            colon_suffixes: default_colon_suffixes(),
            strip_suffixes: default_strip_suffixes(),
            enet_prefixes: default_enet_prefixes(),
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            program_datatypes: default_program_datatypes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CrosscheckConfig {
    pub fn from_toml(input: &str) -> Result<Self, CrosscheckError> {
        let config: CrosscheckConfig =
            toml::from_str(input).map_err(|e| CrosscheckError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CrosscheckError> {
        let n = &self.normalize;

        for s in &n.colon_suffixes {
            if !s.starts_with(':') || s.len() < 2 {
                return Err(CrosscheckError::ConfigValidation(format!(
                    "colon suffix '{s}' must start with ':' and name a member"
                )));
            }
        }

        for s in &n.strip_suffixes {
            if !s.starts_with('_') || s.len() < 2 {
                return Err(CrosscheckError::ConfigValidation(format!(
                    "strip suffix '{s}' must start with '_' and be non-empty"
                )));
            }
        }

        for p in &n.enet_prefixes {
            if !p.ends_with('_') || p.len() < 2 {
                return Err(CrosscheckError::ConfigValidation(format!(
                    "ENet prefix '{p}' must end with '_' and be non-empty"
                )));
            }
        }

        if self.classify.program_datatypes.is_empty() {
            return Err(CrosscheckError::ConfigValidation(
                "program_datatypes must not be empty".into(),
            ));
        }
        for d in &self.classify.program_datatypes {
            if d.trim().is_empty() {
                return Err(CrosscheckError::ConfigValidation(
                    "program datatype entries must be non-empty".into(),
                ));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_known_suffixes() {
        let config = CrosscheckConfig::default();
        assert!(config.normalize.strip_suffixes.iter().any(|s| s == "_EV"));
        assert!(config.normalize.strip_suffixes.iter().any(|s| s == "_FailedToClose"));
        assert!(config.normalize.colon_suffixes.iter().any(|s| s == ":I1"));
        assert!(config.normalize.enet_prefixes.iter().any(|s| s == "E300_"));
        assert!(config.classify.program_datatypes.iter().any(|s| s == "TIMER"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_overrides() {
        let toml = r#"
[normalize]
strip_suffixes = ["_EV", "_CustomSuffix"]

[classify]
program_datatypes = ["DINT", "BOOL"]
"#;
        let config = CrosscheckConfig::from_toml(toml).unwrap();
        assert_eq!(config.normalize.strip_suffixes, vec!["_EV", "_CustomSuffix"]);
        assert_eq!(config.classify.program_datatypes, vec!["DINT", "BOOL"]);
        // Unlisted tables keep defaults
        assert!(!config.normalize.colon_suffixes.is_empty());
    }

    #[test]
    fn reject_malformed_suffix() {
        let toml = r#"
[normalize]
strip_suffixes = ["EV"]
"#;
        let err = CrosscheckConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("'EV'"));
    }

    #[test]
    fn reject_malformed_prefix() {
        let toml = r#"
[normalize]
enet_prefixes = ["E300"]
"#;
        let err = CrosscheckConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("E300"));
    }

    #[test]
    fn reject_empty_datatype_set() {
        let toml = r#"
[classify]
program_datatypes = []
"#;
        let err = CrosscheckConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("program_datatypes"));
    }

    #[test]
    fn reject_unknown_key() {
        let toml = r#"
[normalize]
sufixes = ["_EV"]
"#;
        assert!(CrosscheckConfig::from_toml(toml).is_err());
    }
}
