use crate::error::AppError;
use crate::models::address::{Address, ContactInfo};

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Optional leading `+`, then at least ten digits, spaces, dashes or parentheses.
pub fn is_valid_phone(phone: &str) -> bool {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    body.chars().count() >= 10
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_contact(role: &str, contact: &ContactInfo) -> Result<(), AppError> {
    require_non_empty(&format!("{role} name"), &contact.name)?;
    require_non_empty(&format!("{role} phone"), &contact.phone)?;
    if !is_valid_phone(&contact.phone) {
        return Err(AppError::BadRequest(format!("{role} phone is invalid")));
    }
    if !is_valid_email(&contact.email) {
        return Err(AppError::BadRequest(format!("{role} email is invalid")));
    }
    validate_address(role, &contact.address)
}

fn validate_address(role: &str, address: &Address) -> Result<(), AppError> {
    require_non_empty(&format!("{role} street address"), &address.street)?;
    require_non_empty(&format!("{role} city"), &address.city)?;
    require_non_empty(&format!("{role} state"), &address.state)?;
    require_non_empty(&format!("{role} zip code"), &address.zip_code)?;

    if let Some(point) = &address.coordinates {
        if !crate::geo::is_valid(point) {
            return Err(AppError::BadRequest(format!(
                "{role} coordinates are out of range"
            )));
        }
    }
    Ok(())
}

pub fn require_positive(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::BadRequest(format!("{field} must be greater than 0")));
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{is_valid_email, is_valid_phone, require_non_negative, require_positive};

    #[test]
    fn zero_is_non_negative_but_not_positive() {
        assert!(require_non_negative("distance_km", 0.0).is_ok());
        assert!(require_non_negative("distance_km", -0.5).is_err());
        assert!(require_non_negative("distance_km", f64::NAN).is_err());
        assert!(require_positive("weight", 0.0).is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn phone_shapes() {
        assert!(is_valid_phone("+1234567890"));
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("555-CALL-NOW"));
    }
}
