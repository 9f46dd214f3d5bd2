//! Input validation for uploaded content.

/// Maximum upload filename length.
pub const MAX_FILENAME_LENGTH: usize = 128;

/// Maximum target name length.
pub const MAX_TARGET_NAME_LENGTH: usize = 200;

/// Validate an uploaded video filename.
///
/// Valid format: alphanumeric, hyphens, underscores, dots. No path
/// traversal, no hidden files. The stem becomes the video identifier
/// and the frame store directory name, so this is enforced before
/// anything touches the filesystem.
pub fn is_valid_upload_filename(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FILENAME_LENGTH {
        return false;
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return false;
    }
    if name.starts_with('.') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Trim and bound a target name for safe storage.
pub fn sanitize_target_name(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.len() > MAX_TARGET_NAME_LENGTH {
        trimmed.chars().take(MAX_TARGET_NAME_LENGTH).collect()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_filename_validation() {
        assert!(is_valid_upload_filename("demo.mp4"));
        assert!(is_valid_upload_filename("clip_001-final.mov"));
        assert!(!is_valid_upload_filename(""));
        assert!(!is_valid_upload_filename("../etc/passwd"));
        assert!(!is_valid_upload_filename("path/to/file.mp4"));
        assert!(!is_valid_upload_filename(".hidden.mp4"));
        assert!(!is_valid_upload_filename("has space.mp4"));
    }

    #[test]
    fn test_target_name_sanitization() {
        assert_eq!(sanitize_target_name("  Alice  "), "Alice");
        assert_eq!(sanitize_target_name("\t\n"), "");
        let long = "x".repeat(MAX_TARGET_NAME_LENGTH + 50);
        assert_eq!(sanitize_target_name(&long).len(), MAX_TARGET_NAME_LENGTH);
    }
}
