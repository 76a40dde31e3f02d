use crate::config::types::{
    Config, HarvestConfig, NormalizerConfig, OutputConfig, SourceConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_source_config(&config.source)?;
    validate_normalizer_config(&config.normalizer)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates harvest pipeline settings
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.items_per_page == Some(0) {
        return Err(ConfigError::Validation(
            "items_per_page must be >= 1 when set".to_string(),
        ));
    }

    if config.default_max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "default_max_pages must be >= 1, got {}",
            config.default_max_pages
        )));
    }

    for (name, value) in [
        ("listing_timeout_ms", config.listing_timeout_ms),
        ("fetch_timeout_ms", config.fetch_timeout_ms),
        ("normalize_timeout_ms", config.normalize_timeout_ms),
    ] {
        if value < 100 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 100ms, got {}ms",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the listing and detail source settings
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    validate_template(&config.listing_url, "listing_url", &["{key}", "{page}"])?;
    validate_template(&config.detail_url, "detail_url", &["{id}"])?;

    validate_selector(&config.listing_item_selector, "listing_item_selector")?;

    if config.listing_id_attribute.trim().is_empty() {
        return Err(ConfigError::Validation(
            "listing_id_attribute cannot be empty".to_string(),
        ));
    }

    if config.fields.is_empty() {
        return Err(ConfigError::Validation(
            "source.fields must define at least one field".to_string(),
        ));
    }

    for (name, selector) in &config.fields {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source.fields cannot contain an empty field name".to_string(),
            ));
        }
        validate_selector(selector, &format!("fields.{}", name))?;
    }

    if let Some(selector) = &config.auxiliary_selector {
        validate_selector(selector, "auxiliary_selector")?;

        if config.auxiliary_attribute.trim().is_empty() || config.auxiliary_field.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "auxiliary_attribute and auxiliary_field cannot be empty".to_string(),
            ));
        }

        if config.fields.contains_key(&config.auxiliary_field) {
            return Err(ConfigError::Validation(format!(
                "auxiliary_field '{}' collides with a configured field",
                config.auxiliary_field
            )));
        }
    }

    Ok(())
}

/// Validates the normalizer settings
fn validate_normalizer_config(config: &NormalizerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid normalizer base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Normalizer base_url '{}' must use HTTP or HTTPS",
            config.base_url
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model cannot be empty".to_string()));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    if let Some(temperature) = config.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Validation(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                temperature
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_path.is_empty() {
        return Err(ConfigError::Validation(
            "results_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.raw_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "raw_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a URL template carries its placeholders and parses once filled
fn validate_template(template: &str, name: &str, placeholders: &[&str]) -> Result<(), ConfigError> {
    let mut filled = template.to_string();
    for placeholder in placeholders {
        if !template.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "{} must contain the {} placeholder",
                name, placeholder
            )));
        }
        filled = filled.replace(placeholder, "1");
    }

    let url = Url::parse(&filled)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, template, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            name, template
        )));
    }

    Ok(())
}

fn validate_selector(selector: &str, name: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e)))
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
