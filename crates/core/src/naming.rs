//! File naming rules for locally stored generation outputs.

use crate::error::CoreError;

/// Prefix for images produced by the template-based generate endpoint.
pub const GENERATED_PREFIX: &str = "generated";
/// Prefix for images produced by the raw workflow execute endpoint.
pub const WORKFLOW_PREFIX: &str = "workflow";

/// Extension used for every stored image.
pub const IMAGE_EXTENSION: &str = "png";

/// Build the stored filename for the `index`-th image of `node_id`.
///
/// e.g. `artifact_filename("generated", "9", 0)` -> `generated_9_0.png`
pub fn artifact_filename(prefix: &str, node_id: &str, index: usize) -> String {
    format!("{prefix}_{node_id}_{index}.{IMAGE_EXTENSION}")
}

/// Reject filenames that could escape the output directory.
pub fn validate_filename(filename: &str) -> Result<(), CoreError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
        || filename.contains('\0')
    {
        return Err(CoreError::Validation(format!(
            "Invalid filename: '{filename}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_includes_node_and_index() {
        assert_eq!(artifact_filename(GENERATED_PREFIX, "9", 0), "generated_9_0.png");
        assert_eq!(artifact_filename(WORKFLOW_PREFIX, "74", 3), "workflow_74_3.png");
    }

    #[test]
    fn plain_filename_accepted() {
        assert!(validate_filename("generated_9_0.png").is_ok());
    }

    #[test]
    fn traversal_rejected() {
        assert!(validate_filename("../secret.png").is_err());
        assert!(validate_filename("a/b.png").is_err());
        assert!(validate_filename("a\\b.png").is_err());
        assert!(validate_filename("").is_err());
    }
}
