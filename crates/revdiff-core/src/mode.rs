//! Render mode resolution.
//!
//! Image rendering is only possible when a preview can be produced; binary
//! files with a preview always render as images. Text files keep whatever
//! text layout was requested.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffMode {
    Unified,
    SideBySide,
    Image,
}

impl DiffMode {
    pub fn is_image(self) -> bool {
        self == DiffMode::Image
    }
}

/// Stored text layout preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextDiffMode {
    #[default]
    Unified,
    SideBySide,
}

impl From<TextDiffMode> for DiffMode {
    fn from(mode: TextDiffMode) -> Self {
        match mode {
            TextDiffMode::Unified => DiffMode::Unified,
            TextDiffMode::SideBySide => DiffMode::SideBySide,
        }
    }
}

impl FromStr for TextDiffMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unified" => Ok(TextDiffMode::Unified),
            "sidebyside" => Ok(TextDiffMode::SideBySide),
            other => Err(format!("unknown diff mode: {other}")),
        }
    }
}

impl fmt::Display for TextDiffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextDiffMode::Unified => f.write_str("unified"),
            TextDiffMode::SideBySide => f.write_str("sidebyside"),
        }
    }
}

/// Outcome of [`resolve_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeResolution {
    pub requested: DiffMode,
    pub resolved: DiffMode,
}

impl ModeResolution {
    /// Image and text content are fetched differently, so a changed mode
    /// means the content has to be materialized again.
    pub fn needs_rematerialize(&self) -> bool {
        self.requested != self.resolved
    }
}

pub fn resolve(
    requested: DiffMode,
    is_binary: bool,
    has_image_preview: bool,
    preferred: TextDiffMode,
) -> DiffMode {
    if requested.is_image() && !has_image_preview {
        preferred.into()
    } else if !requested.is_image() && is_binary && has_image_preview {
        DiffMode::Image
    } else {
        requested
    }
}

pub fn resolve_mode(
    requested: DiffMode,
    is_binary: bool,
    has_image_preview: bool,
    preferred: TextDiffMode,
) -> ModeResolution {
    ModeResolution {
        requested,
        resolved: resolve(requested, is_binary, has_image_preview, preferred),
    }
}
