use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub gateway: GatewayConfig,
    pub upstream: UpstreamConfig,
    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub listen_port: u16,
    pub static_root: String,
    pub spa_index: String,
    pub enable_cors: bool,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub restart_delay_secs: u64,
}

impl UpstreamConfig {
    /// Origin the proxy substitutes for its own, e.g. `http://127.0.0.1:8000`
    pub fn origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn host_header(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
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
        // Gateway overrides
        if let Ok(v) = env::var("GATEWAY_PORT").or_else(|_| env::var("PORT")) {
            self.gateway.listen_port = v.parse().unwrap_or(self.gateway.listen_port);
        }
        if let Ok(v) = env::var("GATEWAY_STATIC_ROOT") {
            self.gateway.static_root = v;
        }
        if let Ok(v) = env::var("GATEWAY_SPA_INDEX") {
            self.gateway.spa_index = v;
        }
        if let Ok(v) = env::var("GATEWAY_ENABLE_CORS") {
            self.gateway.enable_cors = v.parse().unwrap_or(self.gateway.enable_cors);
        }
        if let Ok(v) = env::var("GATEWAY_ENABLE_REQUEST_LOGGING") {
            self.gateway.enable_request_logging = v.parse().unwrap_or(self.gateway.enable_request_logging);
        }

        // Upstream overrides
        if let Ok(v) = env::var("UPSTREAM_HOST") {
            self.upstream.host = v;
        }
        if let Ok(v) = env::var("UPSTREAM_PORT") {
            self.upstream.port = v.parse().unwrap_or(self.upstream.port);
        }
        if let Ok(v) = env::var("UPSTREAM_REQUEST_TIMEOUT_SECS") {
            self.upstream.request_timeout_secs = v.parse().unwrap_or(self.upstream.request_timeout_secs);
        }

        // Supervisor overrides
        if let Ok(v) = env::var("SUPERVISOR_ENABLED") {
            self.supervisor.enabled = v.parse().unwrap_or(self.supervisor.enabled);
        }
        if let Ok(v) = env::var("SUPERVISOR_COMMAND") {
            self.supervisor.command = v;
        }
        if let Ok(v) = env::var("SUPERVISOR_ARGS") {
            self.supervisor.args = v.split_whitespace().map(|s| s.to_string()).collect();
        }
        if let Ok(v) = env::var("SUPERVISOR_RESTART_DELAY_SECS") {
            self.supervisor.restart_delay_secs = v.parse().unwrap_or(self.supervisor.restart_delay_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            gateway: GatewayConfig {
                listen_port: 5000,
                static_root: "frontend/build".to_string(),
                spa_index: "index.html".to_string(),
                enable_cors: true,
                enable_request_logging: true,
            },
            upstream: UpstreamConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                request_timeout_secs: 30,
            },
            supervisor: SupervisorConfig {
                enabled: true,
                command: "python".to_string(),
                args: vec![
                    "backend/manage.py".to_string(),
                    "runserver".to_string(),
                    "0.0.0.0:8000".to_string(),
                ],
                restart_delay_secs: 5,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            gateway: GatewayConfig {
                enable_cors: false,
                enable_request_logging: false,
                ..Self::development().gateway
            },
            ..Self::development()
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
