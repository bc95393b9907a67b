use crate::error::{FieldErrors, StallError};
use bigdecimal::BigDecimal;
use num_traits::Zero;

pub const CODE_MAX_LEN: usize = 50;
pub const LOCATION_MAX_LEN: usize = 255;
pub const PRICE_INTEGER_DIGITS: i64 = 8;
pub const PRICE_FRACTION_DIGITS: i64 = 2;

/// Collects field-level failures so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn require<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.reject(field, format!("{} is required", capitalize(field)));
        }
        value
    }

    pub fn check_code(&mut self, code: &str) {
        self.check_text("code", code, CODE_MAX_LEN);
    }

    pub fn check_location(&mut self, location: &str) {
        self.check_text("location", location, LOCATION_MAX_LEN);
    }

    pub fn check_price(&mut self, price: &BigDecimal) {
        if price <= &BigDecimal::zero() {
            self.reject("price", "Price must be greater than 0");
            return;
        }

        let (integer, fraction) = digit_counts(price);
        if integer > PRICE_INTEGER_DIGITS || fraction > PRICE_FRACTION_DIGITS {
            self.reject(
                "price",
                format!(
                    "Price must have at most {} integer digits and {} decimal places",
                    PRICE_INTEGER_DIGITS, PRICE_FRACTION_DIGITS
                ),
            );
        }
    }

    pub fn finish(self) -> Result<(), StallError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(StallError::Validation(self.errors))
        }
    }

    fn check_text(&mut self, field: &str, value: &str, max_len: usize) {
        if value.trim().is_empty() {
            self.reject(field, format!("{} must not be blank", capitalize(field)));
        } else if value.chars().count() > max_len {
            self.reject(
                field,
                format!("{} must not exceed {} characters", capitalize(field), max_len),
            );
        }
    }
}

/// Number of significant integer and fractional digits, ignoring trailing zeros.
fn digit_counts(value: &BigDecimal) -> (i64, i64) {
    let normalized = value.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    let digits = normalized.digits() as i64;
    ((digits - scale).max(0), scale.max(0))
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(value: &str) -> BigDecimal {
        value.parse().unwrap()
    }

    fn price_errors(value: &str) -> Option<String> {
        let mut validator = Validator::new();
        validator.check_price(&price(value));
        match validator.finish() {
            Ok(()) => None,
            Err(StallError::Validation(errors)) => errors.get("price").cloned(),
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn accepts_prices_within_precision() {
        assert_eq!(price_errors("500.00"), None);
        assert_eq!(price_errors("0.01"), None);
        assert_eq!(price_errors("99999999.99"), None);
        assert_eq!(price_errors("1200"), None);
    }

    #[test]
    fn rejects_non_positive_prices() {
        assert_eq!(
            price_errors("-10.00").as_deref(),
            Some("Price must be greater than 0")
        );
        assert_eq!(
            price_errors("0").as_deref(),
            Some("Price must be greater than 0")
        );
    }

    #[test]
    fn rejects_excess_precision() {
        assert!(price_errors("123.456").is_some());
        assert!(price_errors("100000000").is_some());
    }

    #[test]
    fn text_fields_must_be_present_and_bounded() {
        let mut validator = Validator::new();
        validator.check_code("");
        validator.check_location(&"x".repeat(LOCATION_MAX_LEN + 1));
        let Err(StallError::Validation(errors)) = validator.finish() else {
            panic!("expected validation failure");
        };
        assert_eq!(errors["code"], "Code must not be blank");
        assert_eq!(errors["location"], "Location must not exceed 255 characters");
    }

    #[test]
    fn first_failure_per_field_wins() {
        let mut validator = Validator::new();
        assert_eq!(validator.require::<String>("size", None), None);
        validator.reject("size", "second message");
        let Err(StallError::Validation(errors)) = validator.finish() else {
            panic!("expected validation failure");
        };
        assert_eq!(errors["size"], "Size is required");
    }
}
