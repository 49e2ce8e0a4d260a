//! Server configuration module.
//!
//! Supports configuration via environment variables:
//!
//! ```bash
//! # Bearer-token verification secret (required to serve)
//! CREDO_AUTH_SECRET=...
//!
//! # Provider: SMTP
//! CREDO_EMAIL_PROVIDER=smtp
//! SMTP_HOST=smtp.gmail.com
//! SMTP_PORT=587
//! SMTP_USERNAME=user@example.com
//! SMTP_PASSWORD=app_password
//! SMTP_USE_TLS=true
//!
//! # Provider: Resend
//! CREDO_EMAIL_PROVIDER=resend
//! RESEND_API_KEY=re_...
//!
//! # Sender config
//! CREDO_EMAIL_FROM=noreply@credo.dev
//! CREDO_EMAIL_FROM_NAME="Credo"
//!
//! # Verification links
//! CREDO_VERIFY_BASE_URL=https://api.credo.dev
//!
//! # Resend retry policy
//! CREDO_RESEND_MAX_ATTEMPTS=5
//! CREDO_RESEND_RETRY_DELAY_MS=100
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

const DEFAULT_VERIFY_BASE_URL: &str = "http://localhost:8080";

/// Server configuration
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Shared secret for bearer-token verification.
    pub auth_secret: Option<String>,
    /// Outbound email; `None` disables dispatch (resend will fail).
    pub email: Option<EmailConfig>,
    /// Base URL baked into verification links.
    pub verify_base_url: String,
    /// Retry policy for verification dispatch.
    pub retry: RetryPolicy,
}

/// Email configuration for verification dispatch
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Email provider configuration
    pub provider: EmailProviderConfig,
    /// From email address
    pub from_address: String,
    /// Optional from name
    pub from_name: Option<String>,
}

/// Email provider configuration
#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    /// Resend email provider
    Resend {
        /// Resend API key
        #[allow(dead_code)] // Used when email-resend feature is enabled
        api_key: String,
    },
    /// SMTP email provider
    Smtp {
        /// SMTP host
        host: String,
        /// SMTP port
        port: u16,
        /// Optional username
        username: Option<String>,
        /// Optional password
        password: Option<String>,
        /// Whether to use TLS
        use_tls: bool,
    },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid email provider: {0}. Expected 'resend' or 'smtp'")]
    InvalidProvider(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Missing from address: CREDO_EMAIL_FROM is required when email is configured")]
    MissingFromAddress,

    #[error("SMTP provider requires SMTP_HOST")]
    SmtpMissingHost,

    #[error("Invalid value for {0}: {1}")]
    InvalidRetryValue(&'static str, String),
}

fn retry_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidRetryValue(name, raw)),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_secret = env::var("CREDO_AUTH_SECRET").ok();

        let verify_base_url = env::var("CREDO_VERIFY_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_VERIFY_BASE_URL.to_string());

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: retry_var("CREDO_RESEND_MAX_ATTEMPTS", defaults.max_attempts)?,
            delay: Duration::from_millis(retry_var(
                "CREDO_RESEND_RETRY_DELAY_MS",
                defaults.delay.as_millis() as u64,
            )?),
        };

        let email = match env::var("CREDO_EMAIL_PROVIDER").ok() {
            None => None,
            Some(provider_type) => {
                let provider = match provider_type.to_lowercase().as_str() {
                    "resend" => {
                        let api_key = env::var("RESEND_API_KEY")
                            .map_err(|_| ConfigError::MissingEnvVar("RESEND_API_KEY".to_string()))?;
                        EmailProviderConfig::Resend { api_key }
                    }
                    "smtp" => {
                        let host =
                            env::var("SMTP_HOST").map_err(|_| ConfigError::SmtpMissingHost)?;
                        let port = env::var("SMTP_PORT")
                            .unwrap_or_else(|_| "587".to_string())
                            .parse::<u16>()
                            .map_err(|_| {
                                ConfigError::InvalidPort(
                                    env::var("SMTP_PORT")
                                        .unwrap_or_else(|_| "invalid".to_string()),
                                )
                            })?;
                        let username = env::var("SMTP_USERNAME").ok();
                        let password = env::var("SMTP_PASSWORD").ok();
                        let use_tls = env::var("SMTP_USE_TLS")
                            .map(|v| v.to_lowercase() == "true" || v == "1")
                            .unwrap_or(true); // TLS by default

                        EmailProviderConfig::Smtp {
                            host,
                            port,
                            username,
                            password,
                            use_tls,
                        }
                    }
                    other => return Err(ConfigError::InvalidProvider(other.to_string())),
                };

                let from_address =
                    env::var("CREDO_EMAIL_FROM").map_err(|_| ConfigError::MissingFromAddress)?;
                let from_name = env::var("CREDO_EMAIL_FROM_NAME").ok();

                Some(EmailConfig {
                    provider,
                    from_address,
                    from_name,
                })
            }
        };

        Ok(Self {
            auth_secret,
            email,
            verify_base_url,
            retry,
        })
    }
}
