//! Settings read once from the environment at startup.

pub const ENV_WORLD_BANK_API_KEY: &str = "WORLD_BANK_API_KEY";
pub const ENV_OLLAMA_API_KEY: &str = "OLLAMA_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma3:latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub world_bank_api_key: Option<String>,
    pub ollama_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_host: String,
    pub ollama_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            world_bank_api_key: None,
            ollama_api_key: None,
            openai_api_key: None,
            ollama_host: DEFAULT_OLLAMA_HOST.into(),
            ollama_model: DEFAULT_OLLAMA_MODEL.into(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            world_bank_api_key: get(ENV_WORLD_BANK_API_KEY),
            ollama_api_key: get(ENV_OLLAMA_API_KEY),
            openai_api_key: get(ENV_OPENAI_API_KEY),
            ollama_host: get(ENV_OLLAMA_HOST).unwrap_or(defaults.ollama_host),
            ollama_model: get(ENV_OLLAMA_MODEL).unwrap_or(defaults.ollama_model),
        }
    }

    /// Whether a World Bank key is configured, with a message for the status line.
    pub fn api_key_status(&self) -> (bool, String) {
        if self.world_bank_api_key.is_some() {
            (true, format!("{ENV_WORLD_BANK_API_KEY} is set."))
        } else {
            (
                false,
                format!(
                    "{ENV_WORLD_BANK_API_KEY} is not set. The World Bank API works without a key; queries still run."
                ),
            )
        }
    }
}
