use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AstronomyShow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

pub fn validate_title(title: &str) -> Result<(), AppError> {
    if title.is_empty() {
        return Err(AppError::field(
            "title",
            "The astronomy show title cannot be empty.",
        ));
    }
    if title.chars().count() > 255 {
        return Err(AppError::field(
            "title",
            "The astronomy show title must not exceed 255 characters.",
        ));
    }
    Ok(())
}

/// Relative media path for an uploaded show image:
/// `uploads/images/{slug(title)}-{uuid}{ext}`. The uuid keeps replacements
/// from colliding with the file they replace.
pub fn image_path(title: &str, original_filename: &str) -> String {
    let ext = std::path::Path::new(original_filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    format!("uploads/images/{}-{}{}", slugify(title), Uuid::new_v4(), ext)
}

// ASCII-only slug: alphanumerics kept lowercased, runs of anything else
// collapse into single hyphens.
fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_was_sep = true;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('-');
            last_was_sep = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_bounds() {
        assert!(validate_title("Mars Show").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title(&"t".repeat(256)).is_err());
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Mars  Show!"), "mars-show");
        assert_eq!(slugify("Through the Wormhole"), "through-the-wormhole");
        assert_eq!(slugify("--Edge--"), "edge");
    }

    #[test]
    fn image_path_keeps_extension_and_prefix() {
        let path = image_path("Mars Show", "photo.JPG");
        assert!(path.starts_with("uploads/images/mars-show-"));
        assert!(path.ends_with(".jpg"));
    }

    #[test]
    fn image_path_is_unique_per_upload() {
        assert_ne!(
            image_path("Mars Show", "a.png"),
            image_path("Mars Show", "a.png")
        );
    }
}
