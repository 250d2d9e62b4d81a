use std::time::Duration;

/// Kafka ingress config (§6). Only read by binaries that touch the broker.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub broker: String,
    pub topic: String,
    pub consumer_group: String,
    pub ssl_cafile: String,
    pub ssl_certfile: String,
    pub ssl_keyfile: String,
}

impl KafkaConfig {
    pub fn from_env() -> Self {
        Self {
            broker: env_or("KAFKA_BROKER", "kafka:9093"),
            topic: env_or("KAFKA_TOPIC", "gps_stream"),
            consumer_group: env_or("CONSUMER_GROUP", "gps_consumers_group"),
            ssl_cafile: env_or("SSL_CAFILE", "/workspace/certs/ca.crt"),
            ssl_certfile: env_or("SSL_CERTFILE", "/workspace/certs/client_cert.pem"),
            ssl_keyfile: env_or("SSL_KEYFILE", "/workspace/certs/client_key.pem"),
        }
    }
}

/// ClickHouse connection config for the `nearyou` namespace.
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    pub url: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl ClickHouseConfig {
    pub fn from_env() -> Self {
        let host = env_or("CLICKHOUSE_HOST", "clickhouse-server");
        let port = env_or("CLICKHOUSE_PORT", "8123");
        Self {
            url: env_or("CLICKHOUSE_URL", &format!("http://{host}:{port}")),
            database: env_or("CLICKHOUSE_DATABASE", "nearyou"),
            user: env_or("CLICKHOUSE_USER", "default"),
            password: std::env::var("CLICKHOUSE_PASSWORD").unwrap_or_default(),
        }
    }

    pub fn client(&self) -> clickhouse::Client {
        clickhouse::Client::default()
            .with_url(&self.url)
            .with_database(&self.database)
            .with_user(&self.user)
            .with_password(&self.password)
    }
}

/// PostGIS spatial-store config (C2).
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db: String,
}

impl PostgresConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("POSTGRES_HOST", "postgres-postgis"),
            port: env_or("POSTGRES_PORT", "5432").parse().unwrap_or(5432),
            user: env_or("POSTGRES_USER", "nearuser"),
            password: env_or("POSTGRES_PASSWORD", "nearypass"),
            db: env_or("POSTGRES_DB", "near_you_shops"),
        }
    }

    pub fn connect_options(&self) -> sqlx::postgres::PgConnectOptions {
        sqlx::postgres::PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.db)
    }
}

/// Cache config shared by C1's consumers (C5 and C9).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
    pub redis_password: Option<String>,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let password = std::env::var("REDIS_PASSWORD").unwrap_or_default();
        Self {
            enabled: env_or("CACHE_ENABLED", "true").to_lowercase() == "true"
                || env_or("CACHE_ENABLED", "true") == "1",
            ttl: Duration::from_secs(env_or("CACHE_TTL", "86400").parse().unwrap_or(86_400)),
            redis_host: env_or("REDIS_HOST", "redis-cache"),
            redis_port: env_or("REDIS_PORT", "6379").parse().unwrap_or(6379),
            redis_db: env_or("REDIS_DB", "0").parse().unwrap_or(0),
            redis_password: if password.is_empty() { None } else { Some(password) },
        }
    }

    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(pw) => format!(
                "redis://:{pw}@{}:{}/{}",
                self.redis_host, self.redis_port, self.redis_db
            ),
            None => format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db),
        }
    }
}

/// LLM provider config for C5.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key: String,
    pub api_base: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let api_base = std::env::var("OPENAI_API_BASE").unwrap_or_default();
        Self {
            provider: env_or("LLM_PROVIDER", "groq"),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            api_base: if api_base.is_empty() { None } else { Some(api_base) },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Installs the `tracing` subscriber the way every binary in this repo wants it:
/// `RUST_LOG`/`LOG_LEVEL` driven, `LOG_FORMAT=json` switches to structured output.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_or("LOG_LEVEL", default_filter)))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if env_or("LOG_FORMAT", "text") == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
