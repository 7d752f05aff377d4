//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::models::Target;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    ///
    /// Variables already present in the process environment win over the file.
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Peer Latency Probe Configuration
#
# Values specified here are used as defaults and can be overridden by
# command-line arguments.

# Targets to probe, in order (comma-separated NODE_ID@HOST:PORT)
# PROBE_TARGETS=12PvuuRCUHBiqfDnmunUXfBhjGwGxgYVnEnibYXDdN9T1Pz3mqn@symbiont.spdns.de:28970

# Only probe targets whose node ID starts with, or whose host equals, one of these
# PROBE_FILTER=1WLf

# Sampling rounds per target
# PROBE_ROUNDS=100

# Delay before every round, in seconds (fractions allowed)
# PROBE_INTERVAL_SECONDS=3

# Bound on one TLS dial, in seconds
# DIAL_TIMEOUT_SECONDS=20

# Bound on one echo probe, in seconds
# ECHO_TIMEOUT_SECONDS=5

# Sample stream format (text or json)
# PROBE_FORMAT=text

# Enable colored output (true/false)
# ENABLE_COLOR=true

# Client identity presented during the handshake (PEM). Both or neither.
# CLIENT_CERT_PATH=/etc/plp/client-chain.pem
# CLIENT_KEY_PATH=/etc/plp/client-key.pem

# Diagnostic log rendering on stderr (console, json or compact)
# LOG_FORMAT=console
"#.to_string()
    }

    /// Save example .env file to disk, refusing to replace an existing one
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(AppError::config(format!(
                "{} already exists; remove it first to write a fresh example",
                path.display()
            )));
        }

        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "PROBE_TARGETS" => {
                for entry in value.split(',') {
                    let entry = entry.trim();
                    if !entry.is_empty() {
                        entry.parse::<Target>()
                            .map_err(|e| AppError::config(format!("Invalid PROBE_TARGETS entry '{}': {}", entry, e)))?;
                    }
                }
            }
            "PROBE_ROUNDS" => {
                let rounds: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_ROUNDS value '{}': {}", value, e)))?;
                if rounds == 0 || rounds > crate::defaults::MAX_ROUNDS {
                    return Err(AppError::config(format!(
                        "PROBE_ROUNDS must be between 1 and {}, got: {}",
                        crate::defaults::MAX_ROUNDS, rounds
                    )));
                }
            }
            "PROBE_INTERVAL_SECONDS" => {
                let interval: f64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_INTERVAL_SECONDS value '{}': {}", value, e)))?;
                if !interval.is_finite() || interval < 0.0 || interval > crate::defaults::MAX_INTERVAL_SECONDS {
                    return Err(AppError::config(format!(
                        "PROBE_INTERVAL_SECONDS must be between 0 and {}, got: {}",
                        crate::defaults::MAX_INTERVAL_SECONDS, value
                    )));
                }
            }
            "DIAL_TIMEOUT_SECONDS" | "ECHO_TIMEOUT_SECONDS" => {
                let timeout: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if timeout == 0 || timeout > crate::defaults::MAX_TIMEOUT_SECONDS {
                    return Err(AppError::config(format!(
                        "{} must be between 1 and {}, got: {}",
                        key, crate::defaults::MAX_TIMEOUT_SECONDS, timeout
                    )));
                }
            }
            "PROBE_FORMAT" => {
                value.parse::<crate::types::OutputFormat>()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_FORMAT value '{}': {}", value, e)))?;
            }
            "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            "LOG_FORMAT" => {
                value.parse::<crate::logging::LogFormat>()
                    .map_err(|e| AppError::config(format!("Invalid LOG_FORMAT value '{}': {}", value, e)))?;
            }
            "CLIENT_CERT_PATH" | "CLIENT_KEY_PATH" => {
                if value.trim().is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PROBE_TARGETS", "Comma-separated NODE_ID@HOST:PORT targets", "1WLf...4f@storjnode000.dynv6.net:28967"),
            ("PROBE_FILTER", "Comma-separated node ID prefixes or hosts to keep", "1WLf,symbiont.spdns.de"),
            ("PROBE_ROUNDS", "Sampling rounds per target", "100"),
            ("PROBE_INTERVAL_SECONDS", "Delay before every round in seconds", "3"),
            ("DIAL_TIMEOUT_SECONDS", "TLS dial timeout in seconds (1-300)", "20"),
            ("ECHO_TIMEOUT_SECONDS", "Echo probe timeout in seconds (1-300)", "5"),
            ("PROBE_FORMAT", "Sample stream format (text or json)", "text"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("CLIENT_CERT_PATH", "PEM certificate chain for the client identity", "client-chain.pem"),
            ("CLIENT_KEY_PATH", "PEM private key for the client identity", "client-key.pem"),
            ("LOG_FORMAT", "Diagnostic log format (console, json or compact)", "compact"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<24} {}\n", var, description));
            help.push_str(&format!("  {:<24} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::validate_lookup(|key| std::env::var(key).ok())
    }

    /// Validate every supported variable the lookup knows about
    pub fn validate_lookup<F>(lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = lookup(var_name)?;
                Self::validate_env_var(var_name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_env_manager_create_example_content() {
        let content = EnvManager::create_example_env_content();

        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_env_manager_save_example_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        EnvManager::save_example_env_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Peer Latency Probe Configuration"));
    }

    #[test]
    fn test_save_example_never_overwrites() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "PROBE_ROUNDS=7\n").unwrap();

        let result = EnvManager::save_example_env_file(temp_file.path());
        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(std::fs::read_to_string(temp_file.path()).unwrap(), "PROBE_ROUNDS=7\n");
    }

    #[test]
    fn test_validate_lookup_reports_bad_values_only() {
        let warnings = EnvManager::validate_lookup(|key| match key {
            "PROBE_ROUNDS" => Some("0".to_string()),
            "LOG_FORMAT" => Some("xml".to_string()),
            "PROBE_FORMAT" => Some("json".to_string()),
            _ => None,
        });

        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.starts_with("Warning: ")));
        assert!(warnings.iter().any(|w| w.contains("PROBE_ROUNDS")));
        assert!(warnings.iter().any(|w| w.contains("LOG_FORMAT")));
    }

    #[test]
    fn test_env_manager_validate_env_var() {
        assert!(EnvManager::validate_env_var("PROBE_TARGETS", "abc@host:1, def@[::1]:2").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_ROUNDS", "100").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_INTERVAL_SECONDS", "0").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_INTERVAL_SECONDS", "2.5").is_ok());
        assert!(EnvManager::validate_env_var("DIAL_TIMEOUT_SECONDS", "20").is_ok());
        assert!(EnvManager::validate_env_var("ECHO_TIMEOUT_SECONDS", "5").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_FORMAT", "json").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "true").is_ok());
        assert!(EnvManager::validate_env_var("LOG_FORMAT", "json").is_ok());

        assert!(EnvManager::validate_env_var("PROBE_TARGETS", "host-without-id:1").is_err());
        assert!(EnvManager::validate_env_var("PROBE_ROUNDS", "0").is_err());
        assert!(EnvManager::validate_env_var("PROBE_INTERVAL_SECONDS", "-1").is_err());
        assert!(EnvManager::validate_env_var("DIAL_TIMEOUT_SECONDS", "0").is_err());
        assert!(EnvManager::validate_env_var("ECHO_TIMEOUT_SECONDS", "301").is_err());
        assert!(EnvManager::validate_env_var("PROBE_FORMAT", "xml").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
        assert!(EnvManager::validate_env_var("CLIENT_KEY_PATH", "  ").is_err());
    }

    #[test]
    fn test_unknown_env_var_ignored() {
        assert!(EnvManager::validate_env_var("SOMETHING_ELSE", "whatever").is_ok());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();

        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("PROBE_TARGETS"));
        assert!(help.contains("DIAL_TIMEOUT_SECONDS"));
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_load_missing_env_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(".env");
        assert!(EnvManager::load_env_file_from(&missing, false).is_ok());
    }
}
