use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
pub use validator::ValidationError;

use crate::constants::{
    EMPTY_TEXT_ERROR, INAPPROPRIATE_NAME_ERROR, INVALID_PET_NAME_ERROR, MAX_FOOD_PURCHASE_QUANTITY,
    PET_NAME_MAX_LENGTH,
};
use crate::profanity::ProfanityFilter;

static PET_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} '\-]*$").expect("valid pet name pattern"));

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Returns the trimmed name when it is acceptable.
pub fn validate_pet_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    let length = name.chars().count();
    if length == 0 || length > PET_NAME_MAX_LENGTH || !PET_NAME_PATTERN.is_match(name) {
        return Err(error("invalid_pet_name", INVALID_PET_NAME_ERROR));
    }
    if ProfanityFilter::validate_name(name).is_err() {
        return Err(error("inappropriate_pet_name", INAPPROPRIATE_NAME_ERROR));
    }
    Ok(name.to_string())
}

pub fn validate_text(field: &'static str, text: &str, max_length: usize) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(error("empty_text", format!("{}: {}", field, EMPTY_TEXT_ERROR)));
    }
    if text.chars().count() > max_length {
        return Err(error(
            "text_too_long",
            format!("{} must be at most {} characters", field, max_length),
        ));
    }
    Ok(())
}

pub fn validate_optional_text(
    field: &'static str,
    text: Option<&str>,
    max_length: usize,
) -> Result<(), ValidationError> {
    match text {
        Some(text) if text.chars().count() > max_length => Err(error(
            "text_too_long",
            format!("{} must be at most {} characters", field, max_length),
        )),
        _ => Ok(()),
    }
}

pub fn validate_intensity(intensity: i32) -> Result<(), ValidationError> {
    if !(1..=5).contains(&intensity) {
        return Err(error("invalid_intensity", "Intensity must be between 1 and 5"));
    }
    Ok(())
}

pub fn validate_purchase_quantity(quantity: i32) -> Result<(), ValidationError> {
    if !(1..=MAX_FOOD_PURCHASE_QUANTITY).contains(&quantity) {
        return Err(error(
            "invalid_quantity",
            format!("Quantity must be between 1 and {}", MAX_FOOD_PURCHASE_QUANTITY),
        ));
    }
    Ok(())
}

pub fn validate_non_negative(field: &'static str, value: i32) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(error("negative_value", format!("{} must not be negative", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pet_name() {
        assert_eq!(validate_pet_name("  Mochi ").unwrap(), "Mochi");
        assert_eq!(validate_pet_name("Señor Whiskers-2").unwrap(), "Señor Whiskers-2");
        assert!(validate_pet_name("   ").is_err());
        assert!(validate_pet_name(&"a".repeat(31)).is_err());
        assert!(validate_pet_name("<script>").is_err());
    }

    #[test]
    fn test_text_limits() {
        assert!(validate_text("content", "thank you", 20).is_ok());
        assert!(validate_text("content", " \n ", 20).is_err());
        let err = validate_text("content", &"x".repeat(21), 20).unwrap_err();
        assert_eq!(err.code, "text_too_long");
        assert!(validate_optional_text("note", None, 5).is_ok());
        assert!(validate_optional_text("note", Some("toolong"), 5).is_err());
    }

    #[test]
    fn test_numeric_ranges() {
        assert!(validate_intensity(1).is_ok());
        assert!(validate_intensity(6).is_err());
        assert!(validate_purchase_quantity(0).is_err());
        assert!(validate_purchase_quantity(99).is_ok());
        assert!(validate_non_negative("reward_money", -1).is_err());
    }
}
