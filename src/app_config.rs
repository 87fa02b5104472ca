// Centralized configuration management for the Loged.in purchase backend
// All env vars are read once at startup by the binary

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Longest sweep window accepted, one year
pub const MAX_LOOKBACK_HOURS: u64 = 24 * 365;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: StripeConfig,
    pub auth: AuthConfig,
    pub reconciliation: ReconciliationConfig,

    /// Public web app URL, used to build post-checkout redirect URLs
    pub app_base_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub disable_embedded_migrations: bool,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub rust_log: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
}

/// Stripe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub default_price_id: Option<String>,
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub webhook_tolerance_secs: u64,
}

/// Bearer-token guard and admin access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret of the auth provider; `None` disables the guard
    pub jwt_secret: Option<String>,
    pub jwt_audience: String,
    pub admin_api_key: Option<String>,
}

/// Periodic sweep for payments whose webhook never arrived
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// 0 disables the sweep
    pub sweep_interval_secs: u64,
    pub lookback_hours: u64,
}

impl ReconciliationConfig {
    /// Sweep window as a chrono duration; `None` when it does not fit
    pub fn lookback(&self) -> Option<chrono::Duration> {
        i64::try_from(self.lookback_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get required env var
        let get_required = |key: &str| -> Result<String, ConfigError> {
            match env::var(key) {
                Ok(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingVar(key.to_string())),
            }
        };

        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let get_optional = |key: &str| -> Option<String> {
            env::var(key).ok().filter(|v| !v.trim().is_empty())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        // Parse bind address to extract port
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        let database = DatabaseConfig {
            url: get_required("DATABASE_URL")?,
            max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", "20")?,
            min_connections: parse_or_default("DATABASE_MIN_CONNECTIONS", "2")?,
            connect_timeout: parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,
            idle_timeout: parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?,
            max_lifetime: parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?,
        };
        if database.max_connections < database.min_connections {
            return Err(ConfigError::InvalidValue(
                "DATABASE_MAX_CONNECTIONS".to_string(),
                "must be >= DATABASE_MIN_CONNECTIONS".to_string(),
            ));
        }

        let stripe_secret_key = get_required("STRIPE_SECRET_KEY")?;
        if environment == Environment::Production && stripe_secret_key.starts_with("sk_test_") {
            return Err(ConfigError::InvalidValue(
                "STRIPE_SECRET_KEY".to_string(),
                "test-mode key configured in production".to_string(),
            ));
        }

        let stripe = StripeConfig {
            secret_key: stripe_secret_key,
            webhook_secret: get_required("STRIPE_WEBHOOK_SECRET")?,
            default_price_id: get_optional("STRIPE_DEFAULT_PRICE_ID"),
            api_base: get_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            request_timeout_secs: parse_u64_or_default("STRIPE_REQUEST_TIMEOUT_SECS", "10")?,
            webhook_tolerance_secs: parse_u64_or_default("STRIPE_WEBHOOK_TOLERANCE_SECS", "300")?,
        };

        let jwt_secret = get_optional("SUPABASE_JWT_SECRET");
        if let Some(ref secret) = jwt_secret {
            if secret.len() < 32 {
                return Err(ConfigError::InvalidValue(
                    "SUPABASE_JWT_SECRET".to_string(),
                    "Secret must be at least 32 characters long".to_string(),
                ));
            }
        }

        let auth = AuthConfig {
            jwt_secret,
            jwt_audience: get_or_default("SUPABASE_JWT_AUDIENCE", "authenticated"),
            admin_api_key: get_optional("ADMIN_API_KEY"),
        };

        let lookback_hours = parse_u64_or_default("RECONCILIATION_LOOKBACK_HOURS", "48")?;
        if !(1..=MAX_LOOKBACK_HOURS).contains(&lookback_hours) {
            return Err(ConfigError::InvalidValue(
                "RECONCILIATION_LOOKBACK_HOURS".to_string(),
                format!("must be between 1 and {}", MAX_LOOKBACK_HOURS),
            ));
        }

        let reconciliation = ReconciliationConfig {
            sweep_interval_secs: parse_u64_or_default("RECONCILIATION_SWEEP_INTERVAL_SECS", "900")?,
            lookback_hours,
        };

        let app_base_url = get_or_default("APP_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();
        if url::Url::parse(&app_base_url).is_err() {
            return Err(ConfigError::InvalidValue(
                "APP_BASE_URL".to_string(),
                "not a valid absolute URL".to_string(),
            ));
        }

        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server = ServerConfig {
            bind_address,
            port,
            rust_log: get_or_default("RUST_LOG", "info"),
        };

        Ok(Self {
            environment,
            server,
            database,
            stripe,
            auth,
            reconciliation,
            app_base_url,
            cors_allowed_origins,
            disable_embedded_migrations: parse_bool_or_default(
                "DISABLE_EMBEDDED_MIGRATIONS",
                "false",
            ),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
