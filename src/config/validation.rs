//! Configuration validation logic.

use crate::config::loader::Config;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_refresh_token(&config.drive.refresh_token)?;
    validate_quota(config.select.quota)?;

    if config.select.max_pages == 0 {
        return Err(Error::ConfigValidation {
            field: "max_pages".to_string(),
            message: "Page cap must be at least 1".to_string(),
        });
    }

    if config.mirror.root_dir.is_empty() {
        return Err(Error::MissingConfig("root_dir".to_string()));
    }

    if let Some(date) = &config.mirror.date {
        validate_ranking_date(date)?;
    }

    Ok(())
}

/// Validate the drive refresh token.
pub fn validate_refresh_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::MissingConfig("refresh_token".to_string()));
    }

    // Check for placeholder values
    let token_lower = token.to_lowercase();
    if token_lower.contains("replaceme") || token_lower.contains("your_token") {
        return Err(Error::ConfigValidation {
            field: "refresh_token".to_string(),
            message: "Refresh token appears to be a placeholder. Provide your drive refresh token."
                .to_string(),
        });
    }

    Ok(())
}

/// Validate the selection quota.
pub fn validate_quota(quota: usize) -> Result<()> {
    if quota == 0 {
        return Err(Error::ConfigValidation {
            field: "quota".to_string(),
            message: "Quota must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Validate a ranking date (`yyyymmdd`).
pub fn validate_ranking_date(date: &str) -> Result<()> {
    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::ConfigValidation {
            field: "date".to_string(),
            message: format!("Invalid ranking date '{}': expected yyyymmdd", date),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_refresh_token_is_missing() {
        assert!(matches!(
            validate_refresh_token(""),
            Err(Error::MissingConfig(_))
        ));
    }

    #[test]
    fn placeholder_refresh_token_is_rejected() {
        assert!(validate_refresh_token("REPLACEME").is_err());
        assert!(validate_refresh_token("actual-looking-token").is_ok());
    }

    #[test]
    fn zero_quota_is_rejected() {
        assert!(validate_quota(0).is_err());
        assert!(validate_quota(1).is_ok());
    }

    #[test]
    fn ranking_date_must_be_yyyymmdd() {
        assert!(validate_ranking_date("20210319").is_ok());
        assert!(validate_ranking_date("2021-03-19").is_err());
        assert!(validate_ranking_date("319").is_err());
    }
}
