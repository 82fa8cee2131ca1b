use super::{types::Config, ConfigError, SourceKind};

/// Validate configuration
/// Currently validates:
/// - Every source has a name and an http(s) URL
/// - Paging bounds are non-zero
/// - The site API key is set when a source is served by the site API
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.site.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "site.page_size cannot be 0".to_string(),
        ));
    }

    if config.site.max_pages == 0 {
        return Err(ConfigError::ValidationError(
            "site.max_pages cannot be 0".to_string(),
        ));
    }

    for source in &config.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "source with url {} has an empty name",
                source.url
            )));
        }

        match reqwest::Url::parse(&source.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "source {} has an invalid url: {}",
                    source.name, source.url
                )));
            }
        }

        if source.kind_for(&config.site) == SourceKind::Api && config.site.api_key.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "source {} uses the site API but site.api_key is not set",
                source.name
            )));
        }
    }

    Ok(())
}
