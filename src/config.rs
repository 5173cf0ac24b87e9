use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub admin_key: String,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests per minute for claim/lease endpoints.
    pub standard_rpm: u32,
    /// Requests per minute for the external-code fetch endpoint.
    pub strict_rpm: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("KEYLEASE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let admin_key = env::var("KEYLEASE_ADMIN_KEY").unwrap_or_else(|_| {
            if dev_mode {
                "dev-admin-key".to_string()
            } else {
                panic!("KEYLEASE_ADMIN_KEY must be set outside dev mode")
            }
        });

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "keylease.db".to_string()),
            admin_key,
            mail_api_url: env::var("MAIL_API_URL").ok(),
            mail_api_key: env::var("MAIL_API_KEY").ok(),
            rate_limit: RateLimitConfig {
                standard_rpm: env_u32("RATE_LIMIT_STANDARD_RPM", 30),
                strict_rpm: env_u32("RATE_LIMIT_STRICT_RPM", 6),
            },
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
