use anyhow::{anyhow, Context, Result};
use plotters::style::RGBAColor;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_THEME: &str = "feature_based";

const FALLBACK_MOTORWAY: &str = "#E5B94F";
const FALLBACK_PRIMARY: &str = "#E5B94F";
const FALLBACK_SECONDARY: &str = "#888888";
const FALLBACK_RESIDENTIAL: &str = "#333333";
const FALLBACK_WATER: &str = "#FFFFFF";

/// An sRGB colour with alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA` or a handful of CSS names.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();

        if let Some(hex) = value.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(anyhow!("invalid colour {:?}", value));
            }
            let digits = |s: &str| u8::from_str_radix(s, 16).map_err(|_| anyhow!("invalid colour {:?}", value));
            return match hex.len() {
                3 => {
                    let expand = |i: usize| digits(&hex[i..i + 1]).map(|d| d * 17);
                    Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
                }
                6 | 8 => {
                    let a = if hex.len() == 8 { digits(&hex[6..8])? } else { 255 };
                    Ok(Self {
                        r: digits(&hex[0..2])?,
                        g: digits(&hex[2..4])?,
                        b: digits(&hex[4..6])?,
                        a,
                    })
                }
                _ => Err(anyhow!("invalid colour {:?}", value)),
            };
        }

        let named = match value.to_ascii_lowercase().as_str() {
            "black" => Self::rgb(0, 0, 0),
            "white" => Self::rgb(255, 255, 255),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "silver" => Self::rgb(192, 192, 192),
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "navy" => Self::rgb(0, 0, 128),
            "teal" => Self::rgb(0, 128, 128),
            "gold" => Self::rgb(255, 215, 0),
            "orange" => Self::rgb(255, 165, 0),
            "none" | "transparent" => Self { r: 0, g: 0, b: 0, a: 0 },
            _ => return Err(anyhow!("unknown colour {:?}", value)),
        };
        Ok(named)
    }

    pub fn to_plotters(self) -> RGBAColor {
        RGBAColor(self.r, self.g, self.b, self.a as f64 / 255.0)
    }
}

/// Colour scheme of a poster, as stored in `themes/<name>.json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub name: Option<String>,
    pub bg: String,
    #[serde(default)]
    pub water: Option<String>,
    #[serde(default)]
    pub road_motorway: Option<String>,
    #[serde(default)]
    pub road_primary: Option<String>,
    #[serde(default)]
    pub road_secondary: Option<String>,
    #[serde(default)]
    pub road_residential: Option<String>,
}

impl Default for Theme {
    /// Built-in dark theme used when the requested theme file is missing
    fn default() -> Self {
        Self {
            name: Some("default dark".to_string()),
            bg: "#0b1622".to_string(),
            water: Some("#1a2a3a".to_string()),
            road_motorway: Some("#E5B94F".to_string()),
            road_primary: Some("#E5B94F".to_string()),
            road_secondary: Some("#555555".to_string()),
            road_residential: Some("#333333".to_string()),
        }
    }
}

impl Theme {
    /// Land colour
    pub fn background(&self) -> Rgba {
        self.color(Some(&self.bg), FALLBACK_WATER)
    }

    /// Sea and inland water colour; also the canvas colour
    pub fn water(&self) -> Rgba {
        self.color(self.water.as_deref(), FALLBACK_WATER)
    }

    pub fn motorway(&self) -> Rgba {
        self.color(self.road_motorway.as_deref(), FALLBACK_MOTORWAY)
    }

    pub fn primary(&self) -> Rgba {
        self.color(self.road_primary.as_deref(), FALLBACK_PRIMARY)
    }

    pub fn secondary(&self) -> Rgba {
        self.color(self.road_secondary.as_deref(), FALLBACK_SECONDARY)
    }

    pub fn residential(&self) -> Rgba {
        self.color(self.road_residential.as_deref(), FALLBACK_RESIDENTIAL)
    }

    // Values are checked in `validate`, so a parse failure here only hits the fallback
    fn color(&self, value: Option<&str>, fallback: &str) -> Rgba {
        value
            .and_then(|v| Rgba::parse(v).ok())
            .or_else(|| Rgba::parse(fallback).ok())
            .unwrap_or(Rgba::rgb(255, 255, 255))
    }

    /// Reject any colour value that does not parse
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("bg", Some(self.bg.as_str())),
            ("water", self.water.as_deref()),
            ("road_motorway", self.road_motorway.as_deref()),
            ("road_primary", self.road_primary.as_deref()),
            ("road_secondary", self.road_secondary.as_deref()),
            ("road_residential", self.road_residential.as_deref()),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                Rgba::parse(value).with_context(|| format!("theme key {:?}", key))?;
            }
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let theme: Theme = serde_json::from_str(text)?;
        theme.validate()?;
        Ok(theme)
    }
}

/// Load `<dir>/<name>.json`, falling back to the built-in dark theme when it does not exist.
pub fn load_theme(dir: &Path, name: &str) -> Result<Theme> {
    let path = dir.join(format!("{}.json", name));

    if !path.exists() {
        warn!("Theme {} not found, using default dark theme.", name);
        return Ok(Theme::default());
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading theme {}", path.display()))?;
    let theme = Theme::from_json(&text).with_context(|| format!("loading theme {}", path.display()))?;
    info!("Loaded theme {} from {}", theme.name.as_deref().unwrap_or(name), path.display());
    Ok(theme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(Rgba::parse("#0b1622").unwrap(), Rgba::rgb(0x0b, 0x16, 0x22));
        assert_eq!(Rgba::parse("#E5B94F").unwrap(), Rgba::rgb(0xe5, 0xb9, 0x4f));
        assert_eq!(Rgba::parse("#fff").unwrap(), Rgba::rgb(255, 255, 255));
        assert_eq!(Rgba::parse("#00000080").unwrap().a, 0x80);
    }

    #[test]
    fn test_parse_named_and_invalid_colors() {
        assert_eq!(Rgba::parse("White").unwrap(), Rgba::rgb(255, 255, 255));
        assert_eq!(Rgba::parse("none").unwrap().a, 0);
        assert!(Rgba::parse("#12345").is_err());
        assert!(Rgba::parse("#gggggg").is_err());
        assert!(Rgba::parse("#+f+f+f").is_err());
        assert!(Rgba::parse("#+ff").is_err());
        assert!(Rgba::parse("#ffé").is_err());
        assert!(Rgba::parse("chartreuse-ish").is_err());
    }

    #[test]
    fn test_to_plotters() {
        let color = Rgba::parse("#ff000080").unwrap().to_plotters();
        assert_eq!((color.0, color.1, color.2), (255, 0, 0));
        assert!((color.3 - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_keys_use_styling_fallbacks() {
        let theme = Theme::from_json(r##"{"bg": "#101010", "description": "sparse"}"##).unwrap();
        assert_eq!(theme.background(), Rgba::rgb(0x10, 0x10, 0x10));
        assert_eq!(theme.motorway(), Rgba::rgb(0xe5, 0xb9, 0x4f));
        assert_eq!(theme.secondary(), Rgba::rgb(0x88, 0x88, 0x88));
        assert_eq!(theme.residential(), Rgba::rgb(0x33, 0x33, 0x33));
        assert_eq!(theme.water(), Rgba::rgb(255, 255, 255));
    }

    #[test]
    fn test_theme_requires_bg() {
        assert!(Theme::from_json(r##"{"water": "#000000"}"##).is_err());
    }

    #[test]
    fn test_theme_rejects_bad_color() {
        let err = Theme::from_json(r##"{"bg": "#000", "water": "sea"}"##).unwrap_err();
        assert!(format!("{:#}", err).contains("water"));
    }

    #[test]
    fn test_load_theme_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let theme = load_theme(dir.path(), "nope").unwrap();
        assert_eq!(theme, Theme::default());
        assert_eq!(theme.secondary(), Rgba::rgb(0x55, 0x55, 0x55));
    }

    #[test]
    fn test_load_theme_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("paper.json"),
            r##"{"name": "Paper", "bg": "#f5f0e6", "water": "#a8c5d6", "road_primary": "#222"}"##,
        )
        .unwrap();
        let theme = load_theme(dir.path(), "paper").unwrap();
        assert_eq!(theme.name.as_deref(), Some("Paper"));
        assert_eq!(theme.primary(), Rgba::rgb(0x22, 0x22, 0x22));
    }

    #[test]
    fn test_load_theme_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ bg: ").unwrap();
        assert!(load_theme(dir.path(), "broken").is_err());
    }

    #[test]
    fn test_bundled_themes_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("themes");
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(Theme::from_json(&text).is_ok(), "{}", path.display());
        }
    }
}
