//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// Payment gateway configuration.
///
/// Loaded once at startup and injected into the gateway client and checksum
/// signer. Nothing downstream reads the environment again, so a running
/// engine always signs with the credentials it was constructed with.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub salt_key: String,
    pub salt_index: String,
    pub base_url: String,
    /// Where the gateway sends the payer after checkout.
    pub redirect_base_url: String,
    /// Server-to-server callback endpoint registered with the gateway.
    pub callback_url: String,
    pub timeout_secs: u64,
    /// When false, callback bodies are accepted without X-VERIFY validation
    /// (sandbox gateways omit the header).
    pub verify_callbacks: bool,
}

/// Notification channel configuration
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub sendgrid_api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub onesignal_app_id: String,
    pub onesignal_api_key: String,
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            notify: NotifyConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        self.notify.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GatewayConfig {
            merchant_id: env::var("PHONEPE_MERCHANT_ID")
                .map_err(|_| ConfigError::MissingVariable("PHONEPE_MERCHANT_ID".to_string()))?,
            salt_key: env::var("PHONEPE_SALT_KEY")
                .map_err(|_| ConfigError::MissingVariable("PHONEPE_SALT_KEY".to_string()))?,
            salt_index: env::var("PHONEPE_SALT_INDEX").unwrap_or_else(|_| "1".to_string()),
            base_url: env::var("PHONEPE_BASE_URL").unwrap_or_else(|_| {
                "https://api-preprod.phonepe.com/apis/pg-sandbox".to_string()
            }),
            redirect_base_url: env::var("PAYMENT_REDIRECT_BASE_URL")
                .map_err(|_| ConfigError::MissingVariable("PAYMENT_REDIRECT_BASE_URL".to_string()))?,
            callback_url: env::var("PAYMENT_CALLBACK_URL")
                .map_err(|_| ConfigError::MissingVariable("PAYMENT_CALLBACK_URL".to_string()))?,
            timeout_secs: env::var("PHONEPE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
            verify_callbacks: env::var("PHONEPE_VERIFY_CALLBACKS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PHONEPE_VERIFY_CALLBACKS".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.merchant_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PHONEPE_MERCHANT_ID".to_string()));
        }

        if self.salt_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PHONEPE_SALT_KEY".to_string()));
        }

        if self.salt_index.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PHONEPE_SALT_INDEX".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "PHONEPE_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PHONEPE_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(())
    }
}

impl NotifyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(NotifyConfig {
            sendgrid_api_key: env::var("SENDGRID_API_KEY")
                .map_err(|_| ConfigError::MissingVariable("SENDGRID_API_KEY".to_string()))?,
            sender_email: env::var("SENDGRID_SENDER_EMAIL")
                .map_err(|_| ConfigError::MissingVariable("SENDGRID_SENDER_EMAIL".to_string()))?,
            sender_name: env::var("SENDGRID_SENDER_NAME")
                .unwrap_or_else(|_| "Storefront".to_string()),
            onesignal_app_id: env::var("ONESIGNAL_APP_ID")
                .map_err(|_| ConfigError::MissingVariable("ONESIGNAL_APP_ID".to_string()))?,
            onesignal_api_key: env::var("ONESIGNAL_API_KEY")
                .map_err(|_| ConfigError::MissingVariable("ONESIGNAL_API_KEY".to_string()))?,
            timeout_secs: env::var("NOTIFY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sendgrid_api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue("SENDGRID_API_KEY".to_string()));
        }

        if self.sender_email.trim().is_empty() || !self.sender_email.contains('@') {
            return Err(ConfigError::InvalidValue(
                "SENDGRID_SENDER_EMAIL must be an email address".to_string(),
            ));
        }

        if self.onesignal_app_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("ONESIGNAL_APP_ID".to_string()));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl From<std::num::ParseIntError> for ConfigError {
    fn from(_: std::num::ParseIntError) -> Self {
        ConfigError::InvalidValue("Failed to parse integer value".to_string())
    }
}
