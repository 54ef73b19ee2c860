//! CLI configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tollgate_facilitator::FacilitatorConfig;
use tollgate_guard::{AssetConfig, ServerConfig, DEFAULT_MIME_TYPE, DEFAULT_PRICE};
use tollgate_negotiator::DEFAULT_SIGNER_TIMEOUT_CAP_SECS;
use tollgate_types::{NetworkId, DEFAULT_MAX_TIMEOUT_SECONDS, NETWORK_BASE_SEPOLIA};

use crate::error::{CliError, CliResult};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tollgate.toml";

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax.
fn expand_env_vars(input: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid pattern"));
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

/// CLI configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Paid resource served by `tollgate serve`.
    pub server: ServerSection,
    /// Token override; USDC is used on Base networks when absent.
    pub asset: Option<AssetConfig>,
    /// Facilitator connection.
    pub facilitator: FacilitatorConfig,
    /// Client behaviour for `challenge` and `fetch`.
    pub client: ClientSection,
}

/// Overrides from flags and environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replaces `server.pay_to`.
    pub pay_to: Option<String>,
    /// Replaces `facilitator.api_key`.
    pub api_key: Option<String>,
    /// Replaces `server.network` (CAIP-2).
    pub network: Option<String>,
    /// Replaces `server.price`.
    pub price: Option<String>,
}

impl CliConfig {
    /// Load configuration from a file.
    /// Environment variables in `${VAR}` format are expanded in string values.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.expand_env();
        Ok(config)
    }

    /// Load configuration and apply overrides.
    pub fn load_with(path: &Path, overrides: &ConfigOverrides) -> CliResult<Self> {
        let mut config = Self::load(path)?;
        config.apply(overrides);
        Ok(config)
    }

    fn expand_env(&mut self) {
        let server = &mut self.server;
        for value in [
            &mut server.pay_to,
            &mut server.network,
            &mut server.price,
            &mut server.description,
            &mut self.facilitator.url,
            &mut self.client.network,
        ] {
            *value = expand_env_vars(value);
        }
        if let Some(key) = self.facilitator.api_key.as_mut() {
            *key = expand_env_vars(key);
        }
        if let Some(file) = server.file.as_mut() {
            *file = PathBuf::from(expand_env_vars(&file.to_string_lossy()));
        }
    }

    /// Apply flag and environment overrides.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(pay_to) = &overrides.pay_to {
            self.server.pay_to = pay_to.clone();
        }
        if let Some(key) = &overrides.api_key {
            self.facilitator.api_key = Some(key.clone());
        }
        if let Some(network) = &overrides.network {
            self.server.network = network.clone();
            self.client.network = network.clone();
        }
        if let Some(price) = &overrides.price {
            self.server.price = price.clone();
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// A copy safe to display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(key) = config.facilitator.api_key.as_mut() {
            *key = "<redacted>".to_string();
        }
        config
    }

    /// Build the resource server configuration.
    ///
    /// The result is validated by the guard; this only resolves the network
    /// and asset.
    pub fn server_config(&self) -> CliResult<ServerConfig> {
        let network = NetworkId::parse(&self.server.network)?;
        let asset = match &self.asset {
            Some(asset) => asset.clone(),
            None if network == NetworkId::base() => AssetConfig::usdc_base(),
            None if network == NetworkId::base_sepolia() => AssetConfig::usdc_base_sepolia(),
            None => {
                return Err(CliError::config(format!(
                    "no default asset for network {}; set [asset] in the config file",
                    network
                )))
            }
        };

        Ok(ServerConfig {
            pay_to: self.server.pay_to.clone(),
            network,
            asset,
            price: self.server.price.clone(),
            description: self.server.description.clone(),
            mime_type: self.server.mime_type.clone(),
            max_timeout_seconds: self.server.max_timeout_seconds,
            facilitator: self.facilitator.clone(),
            public_scheme: self.server.public_scheme.clone(),
        })
    }
}

/// Paid resource configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to listen on.
    pub listen: String,
    /// Route of the paid resource.
    pub path: String,
    /// File served after payment; a built-in sample when unset.
    pub file: Option<PathBuf>,
    /// Recipient address.
    pub pay_to: String,
    /// Network (CAIP-2).
    pub network: String,
    /// Price in asset units.
    pub price: String,
    /// Description shown to payers.
    pub description: String,
    /// MIME type of the resource.
    pub mime_type: String,
    /// Seconds a client has to present a proof.
    pub max_timeout_seconds: u64,
    /// Scheme of resource URLs when no `X-Forwarded-Proto` is present.
    pub public_scheme: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_string(),
            path: "/video".to_string(),
            file: None,
            pay_to: String::new(),
            network: NETWORK_BASE_SEPOLIA.to_string(),
            price: DEFAULT_PRICE.to_string(),
            description: String::new(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            max_timeout_seconds: DEFAULT_MAX_TIMEOUT_SECONDS,
            public_scheme: "http".to_string(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Network pre-built proofs are signed for (CAIP-2).
    pub network: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Upper bound on signer steps in seconds.
    pub signer_timeout_cap_secs: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            network: NETWORK_BASE_SEPOLIA.to_string(),
            timeout_secs: 30,
            signer_timeout_cap_secs: DEFAULT_SIGNER_TIMEOUT_CAP_SECS,
        }
    }
}

/// Path of the default configuration file.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_types::{USDC_BASE, USDC_BASE_SEPOLIA};

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.server.network, "eip155:84532");
        assert_eq!(config.server.price, "0.10");
        assert_eq!(config.client.timeout_secs, 30);
        assert!(config.facilitator.api_key.is_none());
    }

    #[test]
    fn test_default_config_path() {
        assert!(default_config_path().ends_with("tollgate.toml"));
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tollgate.toml");

        let mut config = CliConfig::default();
        config.server.pay_to = "0xmerchant".into();
        config.facilitator.api_key = Some("key".into());
        config.save(&config_path).unwrap();

        let loaded = CliConfig::load(&config_path).unwrap();
        assert_eq!(loaded.server.pay_to, "0xmerchant");
        assert_eq!(loaded.facilitator.api_key.as_deref(), Some("key"));
        assert_eq!(loaded.facilitator.retry.max_attempts, 3);
    }

    #[test]
    fn test_config_load_nonexistent_returns_default() {
        let path = Path::new("/tmp/tollgate_nonexistent_12345/tollgate.toml");
        let config = CliConfig::load(path).unwrap();
        assert_eq!(config.server.listen, CliConfig::default().server.listen);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tollgate.toml");
        std::fs::write(
            &config_path,
            "[server]\npay_to = \"0xmerchant\"\nnetwork = \"eip155:8453\"\n\n[facilitator]\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = CliConfig::load(&config_path).unwrap();
        assert_eq!(config.server.network, "eip155:8453");
        assert_eq!(config.server.path, "/video");
        assert_eq!(config.facilitator.timeout_secs, 5);
        assert_eq!(config.facilitator.url, tollgate_facilitator::DEFAULT_FACILITATOR_URL);
        assert_eq!(
            config.facilitator.network_format,
            tollgate_types::NetworkTagFormat::LegacyName
        );
    }

    #[test]
    fn test_facilitator_network_format() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tollgate.toml");
        std::fs::write(&config_path, "[facilitator]\nnetwork_format = \"caip2\"\n").unwrap();

        let config = CliConfig::load(&config_path).unwrap();
        assert_eq!(
            config.facilitator.network_format,
            tollgate_types::NetworkTagFormat::Caip2
        );
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TOLLGATE_TEST_API_KEY", "sk_test_123");

        assert_eq!(expand_env_vars("${TOLLGATE_TEST_API_KEY}"), "sk_test_123");
        assert_eq!(
            expand_env_vars("${TOLLGATE_NONEXISTENT_12345}"),
            "${TOLLGATE_NONEXISTENT_12345}"
        );
        assert_eq!(
            expand_env_vars("Bearer ${TOLLGATE_TEST_API_KEY}!"),
            "Bearer sk_test_123!"
        );

        std::env::remove_var("TOLLGATE_TEST_API_KEY");
    }

    #[test]
    fn test_file_values_are_expanded() {
        std::env::set_var("TOLLGATE_TEST_PAY_TO", "0xfromenv");
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tollgate.toml");
        std::fs::write(&config_path, "[server]\npay_to = \"${TOLLGATE_TEST_PAY_TO}\"\n").unwrap();

        let config = CliConfig::load(&config_path).unwrap();
        assert_eq!(config.server.pay_to, "0xfromenv");
        std::env::remove_var("TOLLGATE_TEST_PAY_TO");
    }

    #[test]
    fn test_overrides_win() {
        let mut config = CliConfig::default();
        config.apply(&ConfigOverrides {
            pay_to: Some("0xflag".into()),
            api_key: Some("flag-key".into()),
            network: Some("eip155:8453".into()),
            price: Some("1.5".into()),
        });
        assert_eq!(config.server.pay_to, "0xflag");
        assert_eq!(config.server.network, "eip155:8453");
        assert_eq!(config.client.network, "eip155:8453");
        assert_eq!(config.server.price, "1.5");
        assert_eq!(config.facilitator.api_key.as_deref(), Some("flag-key"));
    }

    #[test]
    fn test_server_config_resolves_asset() {
        let mut config = CliConfig::default();
        assert_eq!(config.server_config().unwrap().asset.address, USDC_BASE_SEPOLIA);

        config.server.network = "eip155:8453".into();
        assert_eq!(config.server_config().unwrap().asset.address, USDC_BASE);

        config.server.network = "eip155:1".into();
        assert!(matches!(config.server_config(), Err(CliError::Config(_))));

        config.server.network = "base".into();
        assert!(matches!(config.server_config(), Err(CliError::Codec(_))));
    }

    #[test]
    fn test_redacted_hides_credential() {
        let mut config = CliConfig::default();
        config.facilitator.api_key = Some("sk_live_secret".into());
        let shown = toml::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("sk_live_secret"));
        assert!(shown.contains("<redacted>"));
    }
}
