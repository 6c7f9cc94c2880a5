use rawgate_common::{env_first, env_flag, env_or, env_string};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

#[derive(Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub store: StoreSettings,
    pub denied_response: DeniedResponse,
    pub public_base_url: Option<String>,
    pub access_counting: bool,
    pub metadata_headers: bool,
    /// Echoes internal error text in 500 bodies. Leaks store details; keep off in production.
    pub expose_error_detail: bool,
}

#[derive(Clone)]
pub enum StoreSettings {
    Upstash {
        url: String,
        token: String,
        timeout: Duration,
    },
    Memory {
        seed_file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Upstash,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeniedResponse {
    Forbidden,
    LoaderPage,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, String> {
        let backend = parse_or_warn("STORE_BACKEND", StoreBackend::Upstash);
        let store = match backend {
            StoreBackend::Upstash => {
                let url = env_first(&["KV_REST_API_URL", "UPSTASH_REDIS_REST_URL"])
                    .ok_or("KV_REST_API_URL or UPSTASH_REDIS_REST_URL is required")?;
                let token = env_first(&["KV_REST_API_TOKEN", "UPSTASH_REDIS_REST_TOKEN"])
                    .ok_or("KV_REST_API_TOKEN or UPSTASH_REDIS_REST_TOKEN is required")?;
                let timeout = Duration::from_millis(env_or("STORE_TIMEOUT_MS", 10_000u64));
                StoreSettings::Upstash {
                    url,
                    token,
                    timeout,
                }
            }
            StoreBackend::Memory => StoreSettings::Memory {
                seed_file: env_string("SCRIPT_SEED_FILE").map(PathBuf::from),
            },
        };

        Ok(Self {
            port: env_or("PORT", 8080u16),
            store,
            denied_response: parse_or_warn("DENIED_RESPONSE", DeniedResponse::Forbidden),
            public_base_url: env_string("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            access_counting: env_flag("ACCESS_COUNTING", true),
            metadata_headers: env_flag("SCRIPT_METADATA_HEADERS", true),
            expose_error_detail: env_flag("EXPOSE_ERROR_DETAIL", false),
        })
    }

    /// Memory store with defaults everywhere else.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            port: 8080,
            store: StoreSettings::Memory { seed_file: None },
            denied_response: DeniedResponse::Forbidden,
            public_base_url: None,
            access_counting: true,
            metadata_headers: true,
            expose_error_detail: false,
        }
    }
}

fn parse_or_warn<T>(key: &str, default: T) -> T
where
    T: FromStr<Err = String> + fmt::Display,
{
    let Some(raw) = env_string(key) else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                key,
                error = %err,
                fallback = %default,
                "invalid setting, using default"
            );
            default
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upstash" | "vercel-kv" | "vercel_kv" | "kv" => Ok(StoreBackend::Upstash),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            StoreBackend::Upstash => "upstash",
            StoreBackend::Memory => "memory",
        };
        write!(f, "{value}")
    }
}

impl FromStr for DeniedResponse {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "forbidden" | "403" => Ok(DeniedResponse::Forbidden),
            "loader_page" | "loader-page" | "html" => Ok(DeniedResponse::LoaderPage),
            other => Err(format!("unknown denied response: {other}")),
        }
    }
}

impl fmt::Display for DeniedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            DeniedResponse::Forbidden => "forbidden",
            DeniedResponse::LoaderPage => "loader_page",
        };
        write!(f, "{value}")
    }
}
