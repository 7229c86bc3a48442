use super::ApiError;

pub fn validate_id(id: i32, what: &str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            what, id
        )));
    }
    Ok(id)
}

/// Inclusive ISO date, the only format job date bounds accept.
pub fn validate_iso_date(value: &str, field: &str) -> Result<String, ApiError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::validation(format!("Invalid {field}: expected YYYY-MM-DD, got '{value}'"))
    })?;
    Ok(value.to_string())
}

pub fn validate_term(term: &str) -> Result<&str, ApiError> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Term cannot be empty"));
    }
    if trimmed.len() > 200 {
        return Err(ApiError::validation("Term must be 200 characters or less"));
    }
    Ok(trimmed)
}

pub fn validate_username(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }
    if trimmed.len() > 50 {
        return Err(ApiError::validation(
            "Username must be 50 characters or less",
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, dots, hyphens, and underscores",
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1, "client").is_ok());
        assert!(validate_id(0, "client").is_err());
        assert!(validate_id(-1, "client").is_err());
    }

    #[test]
    fn test_validate_iso_date() {
        assert!(validate_iso_date("2025-06-17", "date_from").is_ok());
        assert!(validate_iso_date("06/17/2025", "date_from").is_err());
        assert!(validate_iso_date("2025-13-01", "date_from").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("clerk_01").is_ok());
        assert!(validate_username("j.doe").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_term() {
        assert!(validate_term("zoning variance").is_ok());
        assert_eq!(validate_term("  trimmed  ").unwrap(), "trimmed");
        assert!(validate_term("   ").is_err());
    }
}
