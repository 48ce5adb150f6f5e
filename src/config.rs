use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub gmail: GmailConfig,
    pub gemini: GeminiConfig,
    pub digest: DigestConfig,
    pub analyzer: AnalyzerConfig,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub schedule_times: Vec<String>, // Format: "HH:MM" (e.g., ["08:00", "18:00"])
}

#[derive(Debug, Deserialize, Clone)]
pub struct GmailConfig {
    pub credentials_path: String,
    pub token_cache_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    /// Absent keys are reported by the run itself, not at load time.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DigestConfig {
    pub max_results: u32,
    /// Sender domain that switches the analysis into translation mode
    pub translation_domain: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gmail: GmailConfig {
                credentials_path: "./client_credentials.json".to_string(),
                token_cache_path: "./gmail-token-cache.json".to_string(),
            },
            gemini: GeminiConfig {
                api_key: None,
                model: "gemini-2.0-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                timeout_secs: 60,
            },
            digest: DigestConfig {
                max_results: 50,
                translation_domain: "newsletter.ftchinese.com".to_string(),
            },
            analyzer: AnalyzerConfig {
                max_retries: 3,
                retry_base_delay_ms: 1000,
            },
            scheduler: SchedulerConfig {
                enabled: false,
                schedule_times: vec!["08:00".to_string()],
            },
            server: ServerConfig { port: 8080 },
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Fail early when required variables are missing
        Self::check_required_env_vars()?;

        let defaults = Config::default();

        Ok(Config {
            gmail: GmailConfig {
                credentials_path: env_or("GMAIL_CREDENTIALS_PATH", defaults.gmail.credentials_path),
                token_cache_path: env_or("GMAIL_TOKEN_CACHE_PATH", defaults.gmail.token_cache_path),
            },
            gemini: GeminiConfig {
                api_key: std::env::var("GEMINI_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                model: env_or("GEMINI_MODEL", defaults.gemini.model),
                base_url: env_or("GEMINI_BASE_URL", defaults.gemini.base_url),
                timeout_secs: env_parse("GEMINI_TIMEOUT_SECS", defaults.gemini.timeout_secs),
            },
            digest: DigestConfig {
                max_results: env_parse("DIGEST_MAX_RESULTS", defaults.digest.max_results),
                translation_domain: env_or("DIGEST_TRANSLATION_DOMAIN", defaults.digest.translation_domain)
                    .to_lowercase(),
            },
            analyzer: AnalyzerConfig {
                max_retries: env_parse("ANALYZER_MAX_RETRIES", defaults.analyzer.max_retries).max(1),
                retry_base_delay_ms: env_parse("ANALYZER_RETRY_DELAY_MS", defaults.analyzer.retry_base_delay_ms),
            },
            scheduler: SchedulerConfig {
                enabled: env_parse("SCHEDULER_ENABLED", false),
                schedule_times: std::env::var("SCHEDULER_TIMES")
                    .map(|times| parse_schedule_times(&times))
                    .unwrap_or(defaults.scheduler.schedule_times),
            },
            server: ServerConfig {
                port: env_parse("PORT", defaults.server.port),
            },
        })
    }

    fn check_required_env_vars() -> Result<()> {
        let required_vars = [
            "GMAIL_CREDENTIALS_PATH",
        ];

        let missing_vars: Vec<&str> = required_vars
            .iter()
            .filter(|var| std::env::var(var).is_err())
            .copied()
            .collect();

        if !missing_vars.is_empty() {
            anyhow::bail!(
                "Missing environment variables: {}\n\
                 \n\
                 💡 Solutions:\n\
                 1. Create a .env file with your credentials:\n\
                    GMAIL_CREDENTIALS_PATH=/path/to/client_credentials.json\n\
                    GEMINI_API_KEY=your-key\n\
                 \n\
                 2. Or export the variables manually:\n\
                    export GMAIL_CREDENTIALS_PATH=/path/to/client_credentials.json\n\
                    export GMAIL_TOKEN_CACHE_PATH=./gmail-token-cache.json\n\
                    cargo run -- --dry-run",
                missing_vars.join(", ")
            );
        }

        Ok(())
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid value for {}: '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn parse_schedule_times(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
