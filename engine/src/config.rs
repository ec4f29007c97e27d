use serde::Deserialize;
use std::env;

const DEFAULT_CONFIG_FILE: &str = "phishguard";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub model_path: String,
    pub log_filter: String,
    pub whois: WhoisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhoisConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub bootstrap_server: String,
    pub port: u16,
    pub follow_referrals: bool,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 4000,
            bootstrap_server: "whois.iana.org".to_string(),
            port: 43,
            follow_referrals: true,
            cache_ttl_secs: 3600,
            cache_capacity: 10_000,
        }
    }
}

impl Config {
    /// Defaults, then `phishguard.toml` (or `$PHISHGUARD_CONFIG`), then
    /// `PHISHGUARD_*` environment variables, e.g. `PHISHGUARD_WHOIS__TIMEOUT_MS`.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let file = env::var("PHISHGUARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&file)
    }

    pub fn load_from(file: &str) -> Result<Self, ::config::ConfigError> {
        let whois = WhoisConfig::default();

        ::config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:5001")?
            .set_default("model_path", "phishing_model.json")?
            .set_default("log_filter", "phishguard_engine=info,tower_http=debug")?
            .set_default("whois.enabled", whois.enabled)?
            .set_default("whois.timeout_ms", whois.timeout_ms as i64)?
            .set_default("whois.bootstrap_server", whois.bootstrap_server)?
            .set_default("whois.port", i64::from(whois.port))?
            .set_default("whois.follow_referrals", whois.follow_referrals)?
            .set_default("whois.cache_ttl_secs", whois.cache_ttl_secs as i64)?
            .set_default("whois.cache_capacity", whois.cache_capacity as i64)?
            .add_source(::config::File::with_name(file).required(false))
            .add_source(
                ::config::Environment::with_prefix("PHISHGUARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
