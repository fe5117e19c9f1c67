use regex::Regex;
use crate::error::{AppError, AppResult};

/// 验证联系电话: 数字，可带 +、空格、横线、括号，7-20 位数字
pub fn validate_contact_phone(phone: &str) -> AppResult<()> {
    let phone_regex = Regex::new(r"^\+?[0-9\s\-()]+$")
        .map_err(|e| AppError::InternalError(format!("phone regex: {e}")))?;

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !phone_regex.is_match(phone.trim()) || !(7..=20).contains(&digits) {
        return Err(AppError::ValidationError(
            "Invalid phone number".to_string(),
        ));
    }

    Ok(())
}

/// 规范化电话，只保留数字和开头的 +
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_contact_phone() {
        assert!(validate_contact_phone("010-1234-5678").is_ok());
        assert!(validate_contact_phone("+82 10 1234 5678").is_ok());
        assert!(validate_contact_phone("(02) 123-4567").is_ok());
        assert!(validate_contact_phone("12345").is_err());
        assert!(validate_contact_phone("010-abcd-5678").is_err());
        assert!(validate_contact_phone("").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("010-1234-5678"), "01012345678");
        assert_eq!(normalize_phone(" +82 10 1234 5678 "), "+821012345678");
    }
}
