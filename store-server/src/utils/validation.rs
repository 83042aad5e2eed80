//! Input validation helpers
//!
//! Centralized text length constants and validation functions. Validation
//! failures are returned before anything touches the store.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: product, variant, discount description, etc.
pub const MAX_NAME_LEN: usize = 200;

/// Discount codes as entered by customers
pub const MAX_CODE_LEN: usize = 64;

/// Notes and descriptions (order note, discount description)
pub const MAX_NOTE_LEN: usize = 500;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Maximum lines accepted in a single checkout
pub const MAX_CART_LINES: usize = 100;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Validate that a monetary/percentage value is positive and finite.
pub fn validate_positive_value(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be a positive number"
        )));
    }
    Ok(())
}

/// Validate a cart submission: non-empty, bounded, positive quantities.
pub fn validate_cart_lines(lines: &[shared::models::CartLine]) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(AppError::validation("Cart must not be empty"));
    }
    if lines.len() > MAX_CART_LINES {
        return Err(AppError::validation(format!(
            "Too many cart lines ({}, max {MAX_CART_LINES})",
            lines.len()
        )));
    }
    for line in lines {
        if line.quantity < 1 {
            return Err(AppError::validation(format!(
                "Quantity for product {} must be at least 1",
                line.product_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::CartLine;

    #[test]
    fn test_required_text_rejects_empty() {
        assert!(validate_required_text("  ", "name", MAX_NAME_LEN).is_err());
        assert!(validate_required_text("ok", "name", MAX_NAME_LEN).is_ok());
    }

    #[test]
    fn test_required_text_rejects_overlong() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_required_text(&long, "name", MAX_NAME_LEN).is_err());
    }

    #[test]
    fn test_optional_text_allows_none() {
        assert!(validate_optional_text(&None, "note", MAX_NOTE_LEN).is_ok());
    }

    #[test]
    fn test_positive_value_rejects_nan_and_zero() {
        assert!(validate_positive_value(f64::NAN, "value").is_err());
        assert!(validate_positive_value(0.0, "value").is_err());
        assert!(validate_positive_value(-1.0, "value").is_err());
        assert!(validate_positive_value(9.99, "value").is_ok());
    }

    #[test]
    fn test_cart_lines_rejects_zero_quantity() {
        let lines = vec![CartLine {
            product_id: 1,
            variant_id: None,
            quantity: 0,
        }];
        assert!(validate_cart_lines(&lines).is_err());
    }

    #[test]
    fn test_cart_lines_rejects_empty_cart() {
        assert!(validate_cart_lines(&[]).is_err());
    }
}
