use serde::{Deserialize, Serialize};
use std::fmt;

/// Generation style. Unknown names are kept verbatim as `Custom` and render
/// with the Editorial artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Style {
    #[default]
    Editorial,
    Streetwear,
    Vintage,
    Minimalist,
    Artistic,
    Custom(String),
}

impl Style {
    pub const ALL: [Style; 5] = [
        Style::Editorial,
        Style::Streetwear,
        Style::Vintage,
        Style::Minimalist,
        Style::Artistic,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Style::Editorial => "Editorial",
            Style::Streetwear => "Streetwear",
            Style::Vintage => "Vintage",
            Style::Minimalist => "Minimalist",
            Style::Artistic => "Artistic",
            Style::Custom(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Style::Custom(_))
    }

    /// Representative artifact for the style.
    pub fn artifact_url(&self) -> &'static str {
        match self {
            Style::Editorial | Style::Custom(_) => {
                "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400&h=400&fit=crop"
            }
            Style::Streetwear => {
                "https://images.unsplash.com/photo-1441986300917-64674bd600d8?w=400&h=400&fit=crop"
            }
            Style::Vintage => {
                "https://images.unsplash.com/photo-1441984904996-e0b6ba687e04?w=400&h=400&fit=crop"
            }
            Style::Minimalist => {
                "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=400&h=400&fit=crop"
            }
            Style::Artistic => {
                "https://images.unsplash.com/photo-1541961017774-22349e4a1262?w=400&h=400&fit=crop"
            }
        }
    }
}

impl From<&str> for Style {
    fn from(name: &str) -> Self {
        match name {
            "Editorial" => Style::Editorial,
            "Streetwear" => Style::Streetwear,
            "Vintage" => Style::Vintage,
            "Minimalist" => Style::Minimalist,
            "Artistic" => Style::Artistic,
            other => Style::Custom(other.to_string()),
        }
    }
}

impl From<String> for Style {
    fn from(name: String) -> Self {
        Style::from(name.as_str())
    }
}

impl From<Style> for String {
    fn from(style: Style) -> Self {
        match style {
            Style::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
