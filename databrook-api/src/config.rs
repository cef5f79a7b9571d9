use databrook_errors::AppError;
use std::env;
use std::net::SocketAddr;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// `None` disables sign-in.
    pub google: Option<GoogleConfig>,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::InvalidInput("DATABASE_URL must be set".to_string()))?;

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| AppError::InvalidInput(format!("BIND_ADDR: {}", e)))?;

        let google = match (
            lookup("GOOGLE_CLIENT_ID"),
            lookup("GOOGLE_CLIENT_SECRET"),
            lookup("GOOGLE_REDIRECT_URI"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri,
            }),
            _ => {
                tracing::warn!("GOOGLE_CLIENT_ID/SECRET/REDIRECT_URI not set, sign-in disabled");
                None
            }
        };

        let cookie_secure = match lookup("COOKIE_SECURE").as_deref() {
            None => false,
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            Some(other) => {
                return Err(AppError::InvalidInput(format!("COOKIE_SECURE: unexpected value {other:?}")))
            }
        };

        Ok(Self {
            database_url,
            bind_addr,
            google,
            cookie_secure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/databrook")]).unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.google.is_none());
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_database_url_required() {
        assert!(config(&[]).is_err());
    }

    #[test]
    fn test_google_needs_all_three() {
        let partial = config(&[
            ("DATABASE_URL", "postgres://localhost/databrook"),
            ("GOOGLE_CLIENT_ID", "id"),
        ])
        .unwrap();
        assert!(partial.google.is_none());

        let full = config(&[
            ("DATABASE_URL", "postgres://localhost/databrook"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("GOOGLE_REDIRECT_URI", "http://localhost:3000/auth/callback"),
        ])
        .unwrap();
        assert_eq!(full.google.unwrap().client_id, "id");
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("DATABASE_URL", "x"), ("BIND_ADDR", "nowhere")]).is_err());
        assert!(config(&[("DATABASE_URL", "x"), ("COOKIE_SECURE", "maybe")]).is_err());
    }
}
