//! Accent colours
//!
//! Cards are coloured by academic year (palette row) and semester (palette
//! column). Both are detected in the card text; when detection fails the
//! course id is hashed so a course keeps its colour across reloads. The
//! colour is recomputed on every pass so palette edits apply live.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Hebrew calendar years with a palette row, in row order
pub const HEBREW_YEARS: [u16; 7] = [5784, 5785, 5786, 5787, 5788, 5789, 5790];

/// Semester columns per palette row
pub const SEMESTERS: usize = 3;

const DEFAULT_ROWS: [[&str; SEMESTERS]; 7] = [
    ["#3b82f6", "#818cf8", "#bae6fd"],
    ["#22c55e", "#4ade80", "#bbf7d0"],
    ["#f97316", "#fbbf24", "#fed7aa"],
    ["#f43f5e", "#fda4af", "#fecdd3"],
    ["#a21caf", "#f472b6", "#f3e8ff"],
    ["#2563eb", "#60a5fa", "#dbeafe"],
    ["#b45309", "#f59e42", "#fde68a"],
];

/// Colour for a palette cell that does not exist
pub const MISSING_CELL: &str = "#cccccc";

/// Colour used when the year is not a palette row
pub const NEUTRAL: Hsl = Hsl { h: 220, s: 60, l: 60 };

static BUILTIN: Lazy<Palette> = Lazy::new(|| Palette {
    rows: DEFAULT_ROWS
        .iter()
        .map(|row| row.iter().map(|c| (*c).to_string()).collect())
        .collect(),
});

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"תש(?:פ["'׳״]?([דהוזחט])|["'׳״]?(צ))"#).expect("year pattern compiles")
});

static NUMERIC_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"57[89]\d").expect("numeric year pattern compiles"));

static SEMESTER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\p{L}\p{N}])(א|ב|1|2|3)(?:[^\p{L}\p{N}]|$)")
        .expect("semester pattern compiles")
});

/// Year-row × semester-column colour matrix (hex strings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    rows: Vec<Vec<String>>,
}

impl Palette {
    /// Built-in palette
    #[must_use]
    pub fn builtin() -> &'static Palette {
        &BUILTIN
    }

    /// Palette from explicit rows; rows may be short
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Hex colour of a cell
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .filter(|hex| !hex.is_empty())
    }
}

impl Default for Palette {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

/// Hue/saturation/lightness with integer components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsl {
    pub h: u16,
    pub s: u8,
    pub l: u8,
}

/// Detected academic year and semester column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSemester {
    pub year: Option<u16>,
    pub sem_idx: Option<u8>,
}

impl YearSemester {
    /// Both parts present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.year.is_some() && self.sem_idx.is_some()
    }
}

/// Detect year and semester in free text
#[must_use]
pub fn parse_year_semester(text: &str) -> YearSemester {
    let year = YEAR_TOKEN
        .captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .and_then(|letter| match letter.as_str() {
            "ד" => Some(5784),
            "ה" => Some(5785),
            "ו" => Some(5786),
            "ז" => Some(5787),
            "ח" => Some(5788),
            "ט" => Some(5789),
            "צ" => Some(5790),
            _ => None,
        })
        .or_else(|| {
            NUMERIC_YEAR
                .find(text)
                .and_then(|m| m.as_str().parse().ok())
        });

    let sem_idx = if text.contains("אלול") {
        Some(0)
    } else {
        SEMESTER_TOKEN
            .captures(text)
            .and_then(|c| match &c[1] {
                "1" => Some(0),
                "א" | "2" => Some(1),
                "ב" | "3" => Some(2),
                _ => None,
            })
    };

    YearSemester { year, sem_idx }
}

/// 32-bit `(h << 5) - h + unit` hash over UTF-16 code units
#[must_use]
pub fn id_hash(id: &str) -> i32 {
    id.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    })
}

/// Stable year/semester derived from a course id
#[must_use]
pub fn hash_fallback(course_id: &str) -> YearSemester {
    let h = i64::from(id_hash(course_id));
    let row = usize::try_from(h.abs() % HEBREW_YEARS.len() as i64).unwrap_or(0);
    let column = (h >> 3).abs() % SEMESTERS as i64;
    YearSemester {
        year: Some(HEBREW_YEARS[row]),
        sem_idx: u8::try_from(column).ok(),
    }
}

/// Year/semester from text, falling back to the id hash when either part is missing
#[must_use]
pub fn detect(text: &str, course_id: Option<&str>) -> YearSemester {
    let parsed = parse_year_semester(text);
    if parsed.is_complete() {
        parsed
    } else {
        hash_fallback(course_id.unwrap_or(""))
    }
}

/// Convert `#rgb`/`#rrggbb` to HSL with clamped saturation and lightness
#[must_use]
pub fn hex_to_hsl(hex: &str) -> Hsl {
    let digits = hex.trim().trim_start_matches('#');
    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };
    let channel = |i: usize| {
        expanded
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(|v| f64::from(v) / 255.0)
    };
    let (Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4)) else {
        return NEUTRAL;
    };

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let (h, s) = if (max - min).abs() < f64::EPSILON {
        (0.0, 0.0)
    } else {
        let d = max - min;
        let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let h = if (max - r).abs() < f64::EPSILON {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if (max - g).abs() < f64::EPSILON {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h * 60.0, s)
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Hsl {
        h: (h % 360.0).round() as u16,
        s: ((s * 100.0).round() as u8).clamp(35, 90),
        l: ((l * 100.0).round() as u8).clamp(35, 70),
    }
}

/// Palette colour for a year/semester pair
#[must_use]
pub fn color_for(palette: &Palette, ys: YearSemester) -> Hsl {
    let (Some(year), Some(sem)) = (ys.year, ys.sem_idx) else {
        return NEUTRAL;
    };
    let Some(row) = HEBREW_YEARS.iter().position(|&y| y == year) else {
        return NEUTRAL;
    };
    hex_to_hsl(palette.cell(row, usize::from(sem)).unwrap_or(MISSING_CELL))
}

/// Group heading for a year/semester pair
#[must_use]
pub fn semester_name(ys: YearSemester) -> String {
    let (Some(year), Some(sem)) = (ys.year, ys.sem_idx) else {
        return "קורסים".to_string();
    };
    let sem_name = ["סמסטר אלול", "סמסטר א׳", "סמסטר ב׳"]
        .get(usize::from(sem))
        .copied()
        .unwrap_or("סמסטר");
    let year_name = match year {
        5784 => "תשפ״ד".to_string(),
        5785 => "תשפ״ה".to_string(),
        5786 => "תשפ״ו".to_string(),
        5787 => "תשפ״ז".to_string(),
        5788 => "תשפ״ח".to_string(),
        5789 => "תשפ״ט".to_string(),
        5790 => "תש״ץ".to_string(),
        other => other.to_string(),
    };
    format!("{sem_name} {year_name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hebrew_year_and_semester() {
        let ys = parse_year_semester("מבני נתונים תשפ\"ה סמסטר א׳");
        assert_eq!(ys, YearSemester { year: Some(5785), sem_idx: Some(1) });

        let ys = parse_year_semester("Algebra תש״צ ב");
        assert_eq!(ys, YearSemester { year: Some(5790), sem_idx: Some(2) });

        let ys = parse_year_semester("סדנת אלול 5786");
        assert_eq!(ys, YearSemester { year: Some(5786), sem_idx: Some(0) });
    }

    #[test]
    fn semester_letter_inside_a_word_is_ignored() {
        let ys = parse_year_semester("אביב תשפ\"ד");
        assert_eq!(ys.year, Some(5784));
        assert_eq!(ys.sem_idx, None);
    }

    #[test]
    fn hash_matches_string_hash_convention() {
        assert_eq!(id_hash(""), 0);
        assert_eq!(id_hash("a"), 97);
        assert_eq!(id_hash("ab"), 97 * 31 + 98);
        // "73247": 55, 1756, 54486, 1689118, 52362713
        assert_eq!(id_hash("73247"), 52_362_713);
    }

    #[test]
    fn fallback_is_deterministic() {
        let first = hash_fallback("73247");
        for _ in 0..10 {
            assert_eq!(hash_fallback("73247"), first);
        }
        // 52362713 % 7 = 4 -> 5788; (52362713 >> 3) % 3 = 6545339 % 3 = 2
        assert_eq!(first, YearSemester { year: Some(5788), sem_idx: Some(2) });
    }

    #[test]
    fn detect_prefers_text() {
        let ys = detect("קורס תשפ\"ו סמסטר ב", Some("73247"));
        assert_eq!(ys, YearSemester { year: Some(5786), sem_idx: Some(2) });
        assert_eq!(detect("no metadata", Some("73247")), hash_fallback("73247"));
    }

    #[test]
    fn hex_conversion_clamps() {
        // #3b82f6 -> hsl(217, 91%, 60%) -> saturation clamped to 90
        assert_eq!(hex_to_hsl("#3b82f6"), Hsl { h: 217, s: 90, l: 60 });
        // white -> s 0, l 100 -> clamped
        assert_eq!(hex_to_hsl("#fff"), Hsl { h: 0, s: 35, l: 70 });
        assert_eq!(hex_to_hsl("nonsense"), NEUTRAL);
    }

    #[test]
    fn palette_lookup_and_fallbacks() {
        let palette = Palette::builtin();
        let ys = YearSemester { year: Some(5784), sem_idx: Some(0) };
        assert_eq!(color_for(palette, ys), hex_to_hsl("#3b82f6"));

        let unknown_year = YearSemester { year: Some(5700), sem_idx: Some(0) };
        assert_eq!(color_for(palette, unknown_year), NEUTRAL);

        let short = Palette::from_rows(vec![vec!["#000000".into()]]);
        assert_eq!(color_for(&short, ys), hex_to_hsl("#000000"));
        let missing = YearSemester { year: Some(5784), sem_idx: Some(2) };
        assert_eq!(color_for(&short, missing), hex_to_hsl(MISSING_CELL));
    }

    #[test]
    fn group_names() {
        let ys = YearSemester { year: Some(5785), sem_idx: Some(1) };
        assert_eq!(semester_name(ys), "סמסטר א׳ תשפ״ה");
        assert_eq!(semester_name(YearSemester::default()), "קורסים");
    }
}
