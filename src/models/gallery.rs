//! Gallery targets and their URL conventions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// URL convention used by a gallery category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GalleryVariant {
    /// Major galleries under `/board/`
    #[default]
    Standard,
    /// Minor galleries under `/mgallery/board/`
    Minor,
    /// Mini galleries under `/mini/board/`
    Mini,
}

impl GalleryVariant {
    /// Path of the paginated listing endpoint.
    pub fn list_path(&self) -> &'static str {
        match self {
            GalleryVariant::Standard => "/board/lists/",
            GalleryVariant::Minor => "/mgallery/board/lists/",
            GalleryVariant::Mini => "/mini/board/lists/",
        }
    }

    /// Path of the single-post endpoint.
    pub fn view_path(&self) -> &'static str {
        match self {
            GalleryVariant::Standard => "/board/view/",
            GalleryVariant::Minor => "/mgallery/board/view/",
            GalleryVariant::Mini => "/mini/board/view/",
        }
    }
}

impl FromStr for GalleryVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "major" => Ok(GalleryVariant::Standard),
            "minor" | "mgallery" => Ok(GalleryVariant::Minor),
            "mini" => Ok(GalleryVariant::Mini),
            other => Err(AppError::invalid_argument(format!(
                "unknown gallery variant '{other}' (expected standard, minor or mini)"
            ))),
        }
    }
}

impl fmt::Display for GalleryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GalleryVariant::Standard => "standard",
            GalleryVariant::Minor => "minor",
            GalleryVariant::Mini => "mini",
        };
        f.write_str(name)
    }
}

/// The gallery a harvest run reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryTarget {
    pub id: String,
    #[serde(default)]
    pub variant: GalleryVariant,
}

impl GalleryTarget {
    pub fn new(id: impl Into<String>, variant: GalleryVariant) -> Self {
        Self {
            id: id.into(),
            variant,
        }
    }

    /// Query parameters for one listing page.
    pub fn list_params(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![("id", self.id.clone()), ("page", page.to_string())]
    }

    /// Query parameters for one post.
    pub fn view_params(&self, post_no: &str) -> Vec<(&'static str, String)> {
        vec![("id", self.id.clone()), ("no", post_no.to_string())]
    }
}
