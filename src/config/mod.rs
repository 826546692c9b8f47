use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub routing: RoutingConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Top-level path segment of the protected namespace (no slashes).
    pub namespace: String,
    /// Section every unrecognized route falls back to.
    pub default_section: String,
    pub signin_path: String,
    pub profile_completion_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub session_cookie: String,
    pub session_ttl_hours: u64,
    /// Section prefixes under the namespace reserved for administrators.
    pub admin_prefixes: Vec<String>,
    /// Section name of the end-impersonation action, exempt from the admin-prefix block.
    pub end_impersonation_action: String,
    /// Substring marker identifying OAuth2-flow URLs, used for bypass detection.
    pub oauth2_marker: String,
    pub enable_audit_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Routing overrides
        if let Ok(v) = env::var("DEVPORTAL_NAMESPACE") {
            if !v.is_empty() {
                self.routing.namespace = v;
            }
        }
        if let Ok(v) = env::var("DEVPORTAL_DEFAULT_SECTION") {
            if !v.is_empty() {
                self.routing.default_section = v;
            }
        }
        if let Ok(v) = env::var("DEVPORTAL_SIGNIN_PATH") {
            if !v.is_empty() {
                self.routing.signin_path = v;
            }
        }
        if let Ok(v) = env::var("DEVPORTAL_PROFILE_COMPLETION_PATH") {
            if !v.is_empty() {
                self.routing.profile_completion_path = v;
            }
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_SESSION_COOKIE") {
            if !v.is_empty() {
                self.security.session_cookie = v;
            }
        }
        if let Ok(v) = env::var("SECURITY_SESSION_TTL_HOURS") {
            self.security.session_ttl_hours = v.parse().unwrap_or(self.security.session_ttl_hours);
        }
        if let Ok(v) = env::var("SECURITY_ADMIN_PREFIXES") {
            self.security.admin_prefixes = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging =
                v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            routing: RoutingConfig::defaults(),
            security: SecurityConfig {
                session_cookie: "DEVPORTAL_SESSION".to_string(),
                session_ttl_hours: 24 * 7, // 1 week
                admin_prefixes: vec!["manage-users".to_string()],
                end_impersonation_action: "finalizar-impersonacion".to_string(),
                oauth2_marker: "oauth2".to_string(),
                enable_audit_logging: false,
            },
        }
    }

    fn staging() -> Self {
        let base = Self::development();
        Self {
            environment: Environment::Staging,
            security: SecurityConfig {
                session_ttl_hours: 24,
                enable_audit_logging: true,
                ..base.security
            },
            routing: base.routing,
        }
    }

    fn production() -> Self {
        let base = Self::development();
        Self {
            environment: Environment::Production,
            security: SecurityConfig {
                session_ttl_hours: 4,
                enable_audit_logging: true,
                ..base.security
            },
            routing: base.routing,
        }
    }
}

impl RoutingConfig {
    fn defaults() -> Self {
        Self {
            namespace: "devportal".to_string(),
            default_section: "dashboard".to_string(),
            signin_path: "/signin".to_string(),
            profile_completion_path: "/complete-profile".to_string(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
