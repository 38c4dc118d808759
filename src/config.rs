use std::env;
use std::net::SocketAddr;

/// Longest nonce lifetime accepted from configuration.
const MAX_NONCE_TTL_SECS: u64 = 86_400;

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,

    // CORS: the single browser origin allowed to call with credentials
    pub allowed_origin: String,

    // Sign-in expectations
    pub expected_chain_id: u64,
    pub siwe_domain: Option<String>,

    // Nonce lifecycle (seconds)
    pub nonce_ttl_secs: u64,
    pub sweep_interval_secs: u64,

    // Cookie
    pub cookie_secure: bool,

    // Client-visible rejection detail
    pub expose_failure_reason: bool,

    // Redis (selects the shared nonce store when set)
    pub redis_url: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("allowed_origin", &self.allowed_origin)
            .field("expected_chain_id", &self.expected_chain_id)
            .field("siwe_domain", &self.siwe_domain)
            .field("nonce_ttl_secs", &self.nonce_ttl_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("cookie_secure", &self.cookie_secure)
            .field("expose_failure_reason", &self.expose_failure_reason)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            max_body_bytes: 16 * 1024,
            allowed_origin: "http://localhost:5173".to_string(),
            expected_chain_id: 80002,
            siwe_domain: None,
            nonce_ttl_secs: 600,
            sweep_interval_secs: 60,
            cookie_secure: false,
            expose_failure_reason: true,
            redis_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let defaults = Config::default();

        // Server
        let bind_addr = parse_env_or_default("BIND_ADDR", defaults.bind_addr)?;
        let max_body_bytes = parse_env_or_default("MAX_BODY_BYTES", defaults.max_body_bytes)?;

        // CORS origin must be a bare scheme://host[:port]
        let allowed_origin =
            env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| defaults.allowed_origin.clone());
        validate_origin(&allowed_origin)?;

        // Sign-in expectations
        let expected_chain_id =
            parse_env_or_default("EXPECTED_CHAIN_ID", defaults.expected_chain_id)?;

        let siwe_domain = optional_env("SIWE_DOMAIN");
        if let Some(domain) = &siwe_domain {
            if domain.contains(char::is_whitespace) || domain.contains('/') {
                return Err(ConfigError::InvalidValue(
                    "SIWE_DOMAIN".to_string(),
                    "must be a bare host[:port]".to_string(),
                ));
            }
        }

        // Nonce lifecycle
        let nonce_ttl_secs = parse_env_or_default("NONCE_TTL_SECS", defaults.nonce_ttl_secs)?;
        if nonce_ttl_secs == 0 || nonce_ttl_secs > MAX_NONCE_TTL_SECS {
            return Err(ConfigError::InvalidValue(
                "NONCE_TTL_SECS".to_string(),
                format!("must be between 1 and {}", MAX_NONCE_TTL_SECS),
            ));
        }

        let sweep_interval_secs =
            parse_env_or_default("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        // Cookie: Secure only behind TLS
        let cookie_secure = parse_env_or_default("COOKIE_SECURE", defaults.cookie_secure)?;

        let expose_failure_reason =
            parse_env_or_default("EXPOSE_FAILURE_REASON", defaults.expose_failure_reason)?;

        // Redis is optional; without it nonces live in process memory
        let redis_url = optional_env("REDIS_URL");

        Ok(Config {
            bind_addr,
            max_body_bytes,
            allowed_origin,
            expected_chain_id,
            siwe_domain,
            nonce_ttl_secs,
            sweep_interval_secs,
            cookie_secure,
            expose_failure_reason,
            redis_url,
        })
    }

    pub fn nonce_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.nonce_ttl_secs as i64)
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

/// Read a variable, treating unset and empty the same.
fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_origin(origin: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue("ALLOWED_ORIGIN".to_string(), reason);

    let url = url::Url::parse(origin).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https".to_string()));
    }
    // Origin serialization is "scheme://host[:port]" with default ports dropped
    if url.origin().ascii_serialization() != origin.trim_end_matches('/') {
        return Err(invalid("must be an origin without path or query".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_test_env() {
        env::remove_var("BIND_ADDR");
        env::remove_var("MAX_BODY_BYTES");
        env::remove_var("ALLOWED_ORIGIN");
        env::remove_var("EXPECTED_CHAIN_ID");
        env::remove_var("SIWE_DOMAIN");
        env::remove_var("NONCE_TTL_SECS");
        env::remove_var("SWEEP_INTERVAL_SECS");
        env::remove_var("COOKIE_SECURE");
        env::remove_var("EXPOSE_FAILURE_REASON");
        env::remove_var("REDIS_URL");
    }

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        clear_test_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3001");
        assert_eq!(config.max_body_bytes, 16 * 1024);
        assert_eq!(config.allowed_origin, "http://localhost:5173");
        assert_eq!(config.expected_chain_id, 80002);
        assert_eq!(config.siwe_domain, None);
        assert_eq!(config.nonce_ttl_secs, 600);
        assert_eq!(config.nonce_ttl(), chrono::Duration::minutes(10));
        assert_eq!(config.sweep_interval_secs, 60);
        assert!(!config.cookie_secure);
        assert!(config.expose_failure_reason);
        assert_eq!(config.redis_url, None);

        clear_test_env();
    }

    #[test]
    fn test_overrides() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("EXPECTED_CHAIN_ID", "137");
        env::set_var("SIWE_DOMAIN", "app.example.test");
        env::set_var("COOKIE_SECURE", "true");
        env::set_var("EXPOSE_FAILURE_REASON", "false");
        env::set_var("REDIS_URL", "redis://127.0.0.1:6379");

        let config = Config::from_env().unwrap();
        assert_eq!(config.expected_chain_id, 137);
        assert_eq!(config.siwe_domain.as_deref(), Some("app.example.test"));
        assert!(config.cookie_secure);
        assert!(!config.expose_failure_reason);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));

        clear_test_env();
    }

    #[test]
    fn test_redis_url_not_in_debug_output() {
        let config = Config {
            redis_url: Some("redis://:hunter2@10.0.0.5:6379".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_empty_optional_vars_are_unset() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SIWE_DOMAIN", "");
        env::set_var("REDIS_URL", "  ");

        let config = Config::from_env().unwrap();
        assert_eq!(config.siwe_domain, None);
        assert_eq!(config.redis_url, None);

        clear_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_invalid_chain_id() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("EXPECTED_CHAIN_ID", "0x13882");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ParseError(ref s, _) if s == "EXPECTED_CHAIN_ID"
        ));

        clear_test_env();
    }

    #[test]
    fn test_nonce_ttl_bounds() {
        let _guard = lock_test();
        clear_test_env();

        for bad in ["0", "86401"] {
            env::set_var("NONCE_TTL_SECS", bad);
            assert!(matches!(
                Config::from_env().unwrap_err(),
                ConfigError::InvalidValue(ref s, _) if s == "NONCE_TTL_SECS"
            ));
        }

        env::set_var("NONCE_TTL_SECS", "86400");
        assert_eq!(Config::from_env().unwrap().nonce_ttl_secs, 86_400);

        clear_test_env();
    }

    #[test]
    fn test_zero_sweep_interval() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SWEEP_INTERVAL_SECS", "0");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "SWEEP_INTERVAL_SECS"
        ));

        clear_test_env();
    }

    #[test]
    fn test_invalid_allowed_origin() {
        let _guard = lock_test();
        clear_test_env();

        for bad in ["localhost:5173", "ftp://example.test", "https://example.test/app"] {
            env::set_var("ALLOWED_ORIGIN", bad);
            assert!(
                matches!(
                    Config::from_env().unwrap_err(),
                    ConfigError::InvalidValue(ref s, _) if s == "ALLOWED_ORIGIN"
                ),
                "accepted origin {bad:?}"
            );
        }

        clear_test_env();
    }

    #[test]
    fn test_validate_origin_accepts_bare_origins() {
        for good in [
            "http://localhost:5173",
            "https://example.test",
            "https://example.test/",
        ] {
            assert!(validate_origin(good).is_ok(), "rejected origin {good:?}");
        }
        // Explicit default port does not match the browser's Origin header
        assert!(validate_origin("https://example.test:443").is_err());
        assert!(validate_origin("https://example.test?x=1").is_err());
    }

    #[test]
    fn test_invalid_siwe_domain() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SIWE_DOMAIN", "https://example.test/");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "SIWE_DOMAIN"
        ));

        clear_test_env();
    }
}
