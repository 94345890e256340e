//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
///
/// Credential presence is not checked here: the credential gate refuses to
/// construct without both secrets, so a misconfigured gateway fails at
/// startup with a configuration error rather than silently denying logins.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.assistant.defaults.model.trim().is_empty() {
        errors.push("assistant.defaults.model must not be empty".to_string());
    }
    if config.assistant.defaults.embed_model.trim().is_empty() {
        errors.push("assistant.defaults.embed_model must not be empty".to_string());
    }
    if config.assistant.defaults.max_tokens == 0 {
        errors.push("assistant.defaults.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.assistant.defaults.temperature) {
        errors.push("assistant.defaults.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.assistant.defaults.top_k == 0 {
        errors.push("assistant.defaults.top_k must be > 0".to_string());
    }
    if config.assistant.defaults.memory_token_budget == 0 {
        errors.push("assistant.defaults.memory_token_budget must be > 0".to_string());
    }

    if config.knowledge.dir.trim().is_empty() {
        errors.push("knowledge.dir must not be empty".to_string());
    }
    if config.knowledge.chunk_size == 0 {
        errors.push("knowledge.chunk_size must be > 0".to_string());
    }
    if config.knowledge.chunk_overlap >= config.knowledge.chunk_size {
        errors.push("knowledge.chunk_overlap must be smaller than chunk_size".to_string());
    }

    if config.gateway.enabled && config.gateway.host.trim().is_empty() {
        errors.push("gateway.host is required when the gateway is enabled".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        let config = Config::default();
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.assistant.defaults.top_k = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_validate_rejects_overlap_larger_than_chunk() {
        let mut config = Config::default();
        config.knowledge.chunk_size = 16;
        config.knowledge.chunk_overlap = 16;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.assistant.defaults.max_tokens = 0;
        config.knowledge.dir = String::new();

        let err = validate_config(&config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("max_tokens"));
        assert!(msg.contains("knowledge.dir"));
    }
}
