use anyhow::{bail, Context};
use lazy_static::lazy_static;
use regex::Regex;

pub const DEV_SESSION_SECRET: &str = "fallback-secret-key-for-development";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Overrides the database named in `database_url` when set.
    pub database_name: Option<String>,
    pub collection_name: String,
    pub max_content_length: usize,
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub gemini: GeminiConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} environment variable is required"))
        };

        let gemini = GeminiConfig {
            api_key: required("GEMINI_API_KEY")?,
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".into()),
            base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".into())
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: parse_or(&lookup, "GEMINI_TIMEOUT_SECS", 120)?,
        };
        let database_url = required("DATABASE_URL")?;

        let collection_name = lookup("COLLECTION_NAME").unwrap_or_else(|| "food_items".into());
        if !is_plain_identifier(&collection_name) {
            bail!("COLLECTION_NAME must be a plain identifier, got {collection_name:?}");
        }

        Ok(Self {
            database_url,
            database_name: lookup("DATABASE_NAME").filter(|v| !v.is_empty()),
            collection_name,
            max_content_length: parse_or(&lookup, "MAX_CONTENT_LENGTH", 16 * 1024 * 1024)?,
            debug: lookup("APP_DEBUG")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 5000)?,
            session_secret: lookup("SESSION_SECRET").unwrap_or_else(|| DEV_SESSION_SECRET.into()),
            gemini,
        })
    }

    pub fn uses_dev_session_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value {raw:?}")),
        None => Ok(default),
    }
}

// Table names are spliced into SQL, so only bare identifiers are accepted.
fn is_plain_identifier(name: &str) -> bool {
    lazy_static! {
        static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap();
    }
    IDENT_RE.is_match(name)
}
