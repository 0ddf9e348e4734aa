//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let base_url = config.backend.base_url.trim();
    if base_url.is_empty() {
        errors.push("backend.base_url must not be empty".to_string());
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push("backend.base_url must start with http:// or https://".to_string());
    }
    if config.backend.request_timeout_s == 0 {
        errors.push("backend.request_timeout_s must be > 0".to_string());
    }
    if config.backend.ping_interval_s == 0 {
        errors.push("backend.ping_interval_s must be > 0".to_string());
    }

    match config.logging.format.as_str() {
        "text" | "json" => {}
        other => errors.push(format!("logging.format must be text or json, got '{}'", other)),
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
    fn test_validate_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.backend.base_url = "ftp://example.com".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("backend.base_url"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.backend.request_timeout_s = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("request_timeout_s"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.backend.base_url = String::new();
        config.backend.ping_interval_s = 0;

        let err = validate_config(&config).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("backend.base_url"));
        assert!(text.contains("ping_interval_s"));
    }
}
