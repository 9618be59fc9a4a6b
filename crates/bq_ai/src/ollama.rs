use bq_core::error::AppError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    /// Create a client for a local Ollama. Only `http://127.0.0.1[:port]` is accepted.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let rejected = || {
            AppError::new(
                "AI_REMOTE_NOT_ALLOWED",
                "Ollama base URL must be http://127.0.0.1 with an optional port",
            )
            .with_details(format!("base_url={base_url}"))
        };

        let rest = base_url.strip_prefix("http://127.0.0.1").ok_or_else(rejected)?;
        if !rest.is_empty() {
            let port = rest.strip_prefix(':').ok_or_else(rejected)?;
            if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
                return Err(rejected());
            }
            match port.parse::<u32>() {
                Ok(p) if (1..=65_535).contains(&p) => {}
                _ => return Err(rejected()),
            }
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url)
            .timeout(std::time::Duration::from_millis(800))
            .call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new("AI_OLLAMA_UNHEALTHY", "Ollama health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(AppError::new(
                "AI_OLLAMA_UNREACHABLE",
                "Failed to reach Ollama on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}
