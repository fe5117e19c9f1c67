use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub draw: DrawConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 为空时使用进程内存储（彩排 / 本地开发）
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    /// bcrypt 哈希
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    /// 奖品配置文档在存储中的键
    #[serde(default = "default_document_key")]
    pub document_key: String,
    #[serde(default = "default_max_prizes")]
    pub max_prizes: usize,
    #[serde(default = "default_max_draw_count")]
    pub max_draw_count: u32,
    /// 需要点击揭晓并触发庆祝效果的等级
    #[serde(default = "default_high_ranks")]
    pub high_ranks: Vec<u32>,
    #[serde(default = "default_high_rank_reveal_delay_ms")]
    pub high_rank_reveal_delay_ms: u64,
    /// 揭晓会话闲置多久后清理
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            document_key: default_document_key(),
            max_prizes: default_max_prizes(),
            max_draw_count: default_max_draw_count(),
            high_ranks: default_high_ranks(),
            high_rank_reveal_delay_ms: default_high_rank_reveal_delay_ms(),
            session_ttl_minutes: default_session_ttl_minutes(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_document_key() -> String {
    "settings/prizes".to_string()
}

fn default_max_prizes() -> usize {
    100
}

fn default_max_draw_count() -> u32 {
    100
}

fn default_high_ranks() -> Vec<u32> {
    vec![1, 2]
}

fn default_high_rank_reveal_delay_ms() -> u64 {
    500
}

fn default_session_ttl_minutes() -> i64 {
    120
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env_defaults(),
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_env_defaults() -> Self {
        Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: get_env("DATABASE_URL").unwrap_or_default(),
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", default_max_connections()),
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET")
                    .unwrap_or_else(|| "change-me-in-production".to_string()),
                access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 43_200i64),
            },
            admin: AdminConfig {
                email: get_env("ADMIN_EMAIL").unwrap_or_default(),
                password_hash: get_env("ADMIN_PASSWORD_HASH").unwrap_or_default(),
            },
            draw: DrawConfig::default(),
        }
    }

    /// 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env("SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = get_env("DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(n) = get_env("JWT_ACCESS_EXPIRES_IN").and_then(|v| v.parse().ok()) {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = get_env("ADMIN_EMAIL") {
            self.admin.email = v;
        }
        if let Some(v) = get_env("ADMIN_PASSWORD_HASH") {
            self.admin.password_hash = v;
        }
        if let Some(v) = get_env("DRAW_DOCUMENT_KEY") {
            self.draw.document_key = v;
        }
        if let Some(n) = get_env("DRAW_MAX_PRIZES").and_then(|v| v.parse().ok()) {
            self.draw.max_prizes = n;
        }
        if let Some(n) = get_env("DRAW_MAX_COUNT").and_then(|v| v.parse().ok()) {
            self.draw.max_draw_count = n;
        }
        if let Some(ranks) = get_env("DRAW_HIGH_RANKS").map(|v| parse_rank_list(&v)) {
            self.draw.high_ranks = ranks;
        }
        if let Some(n) = get_env("DRAW_HIGH_RANK_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.draw.high_rank_reveal_delay_ms = n;
        }
        if let Some(n) = get_env("DRAW_SESSION_TTL_MINUTES").and_then(|v| v.parse().ok()) {
            self.draw.session_ttl_minutes = n;
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// "1,2" -> [1, 2]，忽略无法解析的项
fn parse_rank_list(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .collect()
}
