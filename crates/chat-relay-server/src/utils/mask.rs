/// Mask a session key or access key for logging.
/// Keeps the first four characters so separate sessions stay distinguishable.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "***".to_string()
    } else {
        format!("{}***", visible)
    }
}

/// Replace every occurrence of `secret` in `text` with its masked form
pub fn redact_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, &mask_secret(secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_long_secret() {
        assert_eq!(mask_secret("key_abcdefghijkl"), "key_***");
    }

    #[test]
    fn test_mask_short_secret_hides_everything() {
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret(""), "***");
    }

    #[test]
    fn test_redact_secret_in_upstream_body() {
        let body = r#"{"error":"invalid key key_abcdefghijkl","key":"key_abcdefghijkl"}"#;
        let redacted = redact_secret(body, "key_abcdefghijkl");

        assert!(!redacted.contains("key_abcdefghijkl"));
        assert_eq!(redacted.matches("key_***").count(), 2);
    }

    #[test]
    fn test_redact_empty_secret_is_noop() {
        assert_eq!(redact_secret("bad gateway", ""), "bad gateway");
    }
}
