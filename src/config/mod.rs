use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub session_secret: String,
    pub session_expiration_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let session_expiration = env::var("SESSION_EXPIRATION")
            .unwrap_or_else(|_| "24h".into())
            .trim_end_matches('h')
            .parse::<u64>()
            .unwrap_or(24);
        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(3000),
            // 会话签名密钥必须来自环境变量，不允许写死
            session_secret: env::var("SESSION_SECRET")?,
            session_expiration_secs: session_expiration * 3600,
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW")
                .map(|v| v.parse().unwrap_or(60))
                .unwrap_or(60),
            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .map(|v| v.parse().unwrap_or(100))
                .unwrap_or(100),
        })
    }

    pub fn session_expiration(&self) -> Duration {
        Duration::from_secs(self.session_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
