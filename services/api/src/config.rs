use std::{net::SocketAddr, time::Duration};
use tutor_core::config::{ConfigError, EngineConfig};

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Sessions idle for longer than this are dropped.
    pub session_ttl: Duration,
    pub engine: EngineConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let engine = EngineConfig::from_env()?;

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let session_ttl_minutes = std::env::var("SESSION_TTL_MINUTES")
            .unwrap_or_else(|_| "120".to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidValue("SESSION_TTL_MINUTES".to_string(), e.to_string())
            })?;

        Ok(Self {
            bind_address,
            session_ttl: Duration::from_secs(session_ttl_minutes * 60),
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tutor_core::Provider;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("SESSION_TTL_MINUTES");
            env::remove_var("LLM_PROVIDER");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("GROQ_API_KEY");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("CHAT_MODEL");
            env::remove_var("TUTOR_LANGUAGE");
            env::remove_var("RUST_LOG");
            env::remove_var("PROMPTS_PATH");
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        unsafe {
            env::set_var("GROQ_API_KEY", "test-groq-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.session_ttl, Duration::from_secs(120 * 60));
        assert_eq!(config.engine.provider, Provider::Groq);
        assert_eq!(config.engine.language, "Hindi");
    }

    #[test]
    #[serial]
    fn test_config_custom_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("LLM_PROVIDER", "openai");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.engine.provider, Provider::OpenAI);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
            env::set_var("GROQ_API_KEY", "test-groq-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_session_ttl() {
        clear_env_vars();
        unsafe {
            env::set_var("GROQ_API_KEY", "test-groq-key");
            env::set_var("SESSION_TTL_MINUTES", "15");
        }
        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.session_ttl, Duration::from_secs(15 * 60));

        unsafe {
            env::set_var("SESSION_TTL_MINUTES", "soon");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "SESSION_TTL_MINUTES"),
            _ => panic!("Expected InvalidValue for SESSION_TTL_MINUTES"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_provider_key() {
        clear_env_vars();

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("GROQ_API_KEY")),
            _ => panic!("Expected MissingVar for GROQ_API_KEY"),
        }
    }
}
