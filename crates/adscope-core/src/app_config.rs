#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Tunables for one conflict analysis: per-run defaults, hard caps, retry
/// policy and deadlines.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub concurrency_limit: usize,
    pub keywords_page_size: u32,
    pub max_conflicts_per_campaign: usize,
    pub max_total_conflicts: usize,
    pub max_ids_per_request: usize,
    pub max_page_size: u32,
    pub max_concurrency: usize,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_backoff_base: f64,
    pub retry_max_delay_ms: u64,
    pub retry_jitter: bool,
    pub attempt_timeout_secs: u64,
    pub shared_list_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            keywords_page_size: 1000,
            max_conflicts_per_campaign: 10,
            max_total_conflicts: 10,
            max_ids_per_request: 200,
            max_page_size: 10_000,
            max_concurrency: 20,
            retry_max_attempts: 3,
            retry_initial_delay_ms: 1_000,
            retry_backoff_base: 2.0,
            retry_max_delay_ms: 30_000,
            retry_jitter: true,
            attempt_timeout_secs: 30,
            shared_list_timeout_secs: 60,
            analysis_timeout_secs: 300,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub engine: EngineSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("engine", &self.engine)
            .finish()
    }
}
