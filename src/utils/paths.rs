use crate::error::{AppError, Result};

/// Sanitizes file names to remove dangerous characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|&c| {
            !matches!(
                c,
                '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' | '/' | '\\'
            )
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Validates a configured name that becomes a single path component in the
/// destination tree (category names, the log file name).
pub fn validate_component(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AppError::InvalidPath {
            message: "Name cannot be empty".to_string(),
        });
    }

    if name == "." || name == ".." {
        return Err(AppError::InvalidPath {
            message: format!("'{}' is not a valid name", name),
        });
    }

    if name.contains('/') || name.contains('\\') {
        return Err(AppError::InvalidPath {
            message: format!("'{}' contains path separators", name),
        });
    }

    if name.contains('\0') || name.chars().any(|c| c.is_control()) {
        return Err(AppError::InvalidPath {
            message: "Name contains null bytes or control characters".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_reserved_characters() {
        assert_eq!(sanitize_filename("re:sults?.csv"), "results.csv");
        assert_eq!(sanitize_filename("  app.log  "), "app.log");
        assert_eq!(sanitize_filename("a/b\\c"), "abc");
    }

    #[test]
    fn validate_component_rejects_traversal_and_separators() {
        assert!(validate_component("Logs").is_ok());
        assert!(validate_component("Platform Profile").is_ok());
        assert!(validate_component("").is_err());
        assert!(validate_component("..").is_err());
        assert!(validate_component("a/b").is_err());
        assert!(validate_component("a\\b").is_err());
        assert!(validate_component("bad\0name").is_err());
    }
}
