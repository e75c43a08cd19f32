//! View preferences
//!
//! Global presentation settings. Loaded once at startup and replaced
//! whenever another context writes them.

use crate::palette::Palette;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout of the course list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
    Original,
    Carousel,
}

impl ViewMode {
    /// Class applied to the body and each grid's view parent
    #[must_use]
    pub fn class(self) -> Option<&'static str> {
        match self {
            Self::Grid => None,
            Self::List => Some("jct-courses-list-view"),
            Self::Original => Some("jct-view-original"),
            Self::Carousel => Some("jct-view-carousel"),
        }
    }

    /// Every class any mode may apply
    pub const CLASSES: [&'static str; 3] =
        ["jct-courses-list-view", "jct-view-original", "jct-view-carousel"];
}

/// Card skin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStyle {
    #[default]
    Compact,
    Minimal,
    Cards,
    Modern,
    Glass,
}

impl CardStyle {
    /// All styles
    pub const ALL: [CardStyle; 5] = [
        Self::Compact,
        Self::Minimal,
        Self::Cards,
        Self::Modern,
        Self::Glass,
    ];

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Minimal => "minimal",
            Self::Cards => "cards",
            Self::Modern => "modern",
            Self::Glass => "glass",
        }
    }

    /// Body class for this style
    #[must_use]
    pub fn class(self) -> String {
        format!("jct-style-{}", self.as_str())
    }
}

/// Grid column count, always within 3..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct ColumnCount(u8);

impl ColumnCount {
    pub const MIN: u8 = 3;
    pub const MAX: u8 = 6;

    /// Clamp into range
    #[must_use]
    pub fn new(n: i64) -> Self {
        let clamped = n.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        Self(u8::try_from(clamped).unwrap_or(Self::MIN))
    }

    /// Column count
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ColumnCount {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl From<i64> for ColumnCount {
    fn from(n: i64) -> Self {
        Self::new(n)
    }
}

impl From<ColumnCount> for i64 {
    fn from(c: ColumnCount) -> Self {
        i64::from(c.0)
    }
}

impl fmt::Display for ColumnCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPreferences {
    pub view_mode: ViewMode,
    pub card_style: CardStyle,
    pub column_count: ColumnCount,
    /// Year × semester palette; `None` uses the built-in one
    pub color_palette: Option<Palette>,
}

impl ViewPreferences {
    /// Palette in effect
    #[must_use]
    pub fn palette(&self) -> &Palette {
        self.color_palette.as_ref().unwrap_or_else(|| Palette::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_count_clamps() {
        assert_eq!(ColumnCount::new(1).get(), 3);
        assert_eq!(ColumnCount::new(5).get(), 5);
        assert_eq!(ColumnCount::new(40).get(), 6);
        let decoded: ColumnCount = serde_json::from_value(json!(9)).unwrap();
        assert_eq!(decoded.get(), 6);
    }

    #[test]
    fn enums_use_lowercase_names() {
        assert_eq!(serde_json::to_value(ViewMode::Carousel).unwrap(), json!("carousel"));
        let style: CardStyle = serde_json::from_value(json!("glass")).unwrap();
        assert_eq!(style.class(), "jct-style-glass");
        assert!(serde_json::from_value::<ViewMode>(json!("tiles")).is_err());
    }
}
