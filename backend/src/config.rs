use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const MIB: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite path for the session store; `:memory:` keeps sessions in-process.
    pub database: String,
    /// Extra font files loaded on top of the system fonts.
    pub fonts_dir: PathBuf,
    /// Certificates rendered concurrently per batch.
    pub workers: usize,
    pub max_template_bytes: usize,
    pub max_spreadsheet_bytes: usize,
    /// How long a finished job and its archive are kept before eviction.
    pub archive_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: ":memory:".to_string(),
            fonts_dir: PathBuf::from("./fonts"),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_template_bytes: 10 * MIB,
            max_spreadsheet_bytes: 5 * MIB,
            archive_ttl: Duration::from_secs(15 * 60),
        }
    }
}

impl Config {
    /// Reads `CERTGEN_*` variables, after loading an optional `.env` file.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("CERTGEN_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "CERTGEN_PORT", defaults.port),
            database: lookup("CERTGEN_DATABASE").unwrap_or(defaults.database),
            fonts_dir: lookup("CERTGEN_FONTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.fonts_dir),
            workers: parse_or(&lookup, "CERTGEN_WORKERS", defaults.workers).max(1),
            max_template_bytes: parse_or(
                &lookup,
                "CERTGEN_MAX_TEMPLATE_BYTES",
                defaults.max_template_bytes,
            ),
            max_spreadsheet_bytes: parse_or(
                &lookup,
                "CERTGEN_MAX_SPREADSHEET_BYTES",
                defaults.max_spreadsheet_bytes,
            ),
            archive_ttl: Duration::from_secs(parse_or(
                &lookup,
                "CERTGEN_ARCHIVE_TTL_SECS",
                defaults.archive_ttl.as_secs(),
            )),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring invalid {}={:?}, using the default", key, raw);
            default
        }),
    }
}
