use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub node_env: String,
    pub cors_origins: Vec<String>,
    pub db: DbConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub dashboard: DashboardConfig,
    pub stripe: StripeConfig,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
    pub run_migrations: bool,
}

#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
    pub key_prefix: String,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_expiry_secs: i64,
    pub refresh_expiry_secs: i64,
    pub access_cookie: String,
    pub refresh_cookie: String,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
    pub login_max: u32,
}

#[derive(Clone, Debug)]
pub struct DashboardConfig {
    pub cache_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or_parse("PORT", 3000),
            node_env: env_or("NODE_ENV", "development"),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:4321,http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_or_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "softcontrol"),
                user: env_or("DB_USER", "softcontrol_admin"),
                password: env_or("DB_PASSWORD", ""),
                pool_min: env_or_parse("DB_POOL_MIN", 2),
                pool_max: env_or_parse("DB_POOL_MAX", 20),
                run_migrations: env_or_parse("RUN_MIGRATIONS", false),
            },
            redis: RedisConfig {
                host: env_or("REDIS_HOST", ""),
                port: env_or_parse("REDIS_PORT", 6379),
                password: env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
                db: env_or_parse("REDIS_DB", 0),
                key_prefix: "softcontrol:".to_string(),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "change-me-to-a-secure-random-string"),
                access_expiry_secs: parse_duration_to_secs(&env_or("JWT_ACCESS_EXPIRY", "7d")),
                refresh_expiry_secs: parse_duration_to_secs(&env_or("JWT_REFRESH_EXPIRY", "30d")),
                access_cookie: env_or("AUTH_ACCESS_COOKIE", "sc-access-token"),
                refresh_cookie: env_or("AUTH_REFRESH_COOKIE", "sc-refresh-token"),
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: env_or_parse("RATE_LIMIT_MAX", 100),
                login_max: env_or_parse("RATE_LIMIT_LOGIN", 10),
            },
            dashboard: DashboardConfig {
                cache_seconds: env_or_parse("DASHBOARD_CACHE_SEC", 60),
            },
            stripe: StripeConfig {
                secret_key: env_or("STRIPE_SECRET_KEY", ""),
                webhook_secret: env_or("STRIPE_WEBHOOK_SECRET", ""),
                currency: env_or("STRIPE_CURRENCY", "eur"),
                success_url: env_or(
                    "STRIPE_SUCCESS_URL",
                    "http://localhost:4321/licenses/{license_id}/payment-success?session_id={CHECKOUT_SESSION_ID}",
                ),
                cancel_url: env_or(
                    "STRIPE_CANCEL_URL",
                    "http://localhost:4321/licenses/{license_id}/payment-cancel",
                ),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.node_env == "production"
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        if let Ok(url) = env::var("POSTGRES_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }

    /// Redis is optional; with no REDIS_URL/KV_URL and no REDIS_HOST the
    /// dashboard cache is simply disabled.
    pub fn redis_enabled(&self) -> bool {
        env::var("REDIS_URL").is_ok() || env::var("KV_URL").is_ok() || !self.redis.host.is_empty()
    }

    pub fn redis_url(&self) -> String {
        if let Ok(url) = env::var("REDIS_URL") {
            return url;
        }
        if let Ok(url) = env::var("KV_URL") {
            return url;
        }
        match &self.redis.password {
            Some(pw) if !pw.is_empty() => format!(
                "redis://:{}@{}:{}/{}",
                pw, self.redis.host, self.redis.port, self.redis.db
            ),
            _ => format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.db
            ),
        }
    }
}

fn parse_duration_to_secs(s: &str) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return 3600;
    }
    let (num_str, unit) = s.split_at(s.len() - 1);
    let num: i64 = num_str.parse().unwrap_or(1);
    match unit {
        "s" => num,
        "m" => num * 60,
        "h" => num * 3600,
        "d" => num * 86400,
        _ => s.parse().unwrap_or(3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration_to_secs("45s"), 45);
        assert_eq!(parse_duration_to_secs("5m"), 300);
        assert_eq!(parse_duration_to_secs("12h"), 43200);
        assert_eq!(parse_duration_to_secs("7d"), 604800);
        assert_eq!(parse_duration_to_secs("30d"), 2592000);
    }

    #[test]
    fn duration_fallbacks() {
        assert_eq!(parse_duration_to_secs(""), 3600);
        assert_eq!(parse_duration_to_secs("3600"), 3600);
        assert_eq!(parse_duration_to_secs("junk"), 3600);
    }
}
