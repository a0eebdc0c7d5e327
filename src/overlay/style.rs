//! Global text styling shared by every overlay line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest text size the size slider allows, in pixels.
pub const MIN_TEXT_SIZE: u32 = 20;
/// Largest text size the size slider allows, in pixels.
pub const MAX_TEXT_SIZE: u32 = 120;
/// Size the template service assumes when no `size` param is sent.
pub const DEFAULT_TEXT_SIZE: u32 = 50;

/// Font families offered by the font picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Impact,
    Arial,
    Comic,
    Times,
    Helvetica,
    Kalam,
}

impl FontFamily {
    pub fn all() -> &'static [FontFamily] {
        &[
            FontFamily::Impact,
            FontFamily::Arial,
            FontFamily::Comic,
            FontFamily::Times,
            FontFamily::Helvetica,
            FontFamily::Kalam,
        ]
    }

    /// Identifier used in API bodies and template-service query strings.
    pub fn name(&self) -> &'static str {
        match self {
            FontFamily::Impact => "impact",
            FontFamily::Arial => "arial",
            FontFamily::Comic => "comic",
            FontFamily::Times => "times",
            FontFamily::Helvetica => "helvetica",
            FontFamily::Kalam => "kalam",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FontFamily::Impact => "Impact",
            FontFamily::Arial => "Arial",
            FontFamily::Comic => "Comic Sans",
            FontFamily::Times => "Times New Roman",
            FontFamily::Helvetica => "Helvetica",
            FontFamily::Kalam => "Kalam",
        }
    }

    /// CSS font stack the browser preview should use.
    pub fn css_stack(&self) -> &'static str {
        match self {
            FontFamily::Impact => "Impact, Arial Black, sans-serif",
            FontFamily::Arial => "Arial, sans-serif",
            FontFamily::Comic => "Comic Sans MS, cursive",
            FontFamily::Times => "Times New Roman, serif",
            FontFamily::Helvetica => "Helvetica, Arial, sans-serif",
            FontFamily::Kalam => "Kalam, cursive",
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FontFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        FontFamily::all()
            .iter()
            .copied()
            .find(|f| f.name() == lower)
            .ok_or_else(|| format!("Unknown font '{}'", s))
    }
}

/// An opaque RGB color.
///
/// Serialized as `#rrggbb`; parsed from hex (`#rgb`, `#rrggbb`) or a CSS name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn named(name: &str) -> Option<Color> {
        let c = match name {
            "white" => Color::WHITE,
            "black" => Color::BLACK,
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 128, 0),
            "lime" => Color::rgb(0, 255, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "orange" => Color::rgb(255, 165, 0),
            "purple" => Color::rgb(128, 0, 128),
            "pink" => Color::rgb(255, 192, 203),
            "cyan" => Color::rgb(0, 255, 255),
            "magenta" => Color::rgb(255, 0, 255),
            "gold" => Color::rgb(255, 215, 0),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            _ => return None,
        };
        Some(c)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Some(hex) = s.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(format!("Invalid color '#{}'", hex));
            }
            let parse = |h: &str| u8::from_str_radix(h, 16).map_err(|_| format!("Invalid color '#{}'", hex));
            return match hex.len() {
                3 => {
                    let expand = |i: usize| parse(&hex[i..i + 1].repeat(2));
                    Ok(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
                }
                6 => Ok(Color::rgb(parse(&hex[0..2])?, parse(&hex[2..4])?, parse(&hex[4..6])?)),
                _ => Err(format!("Invalid color '#{}'", hex)),
            };
        }
        Color::named(&s).ok_or_else(|| format!("Unknown color '{}'", s))
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Rendering parameters applied to all lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleSettings {
    pub font: FontFamily,
    pub fill: Color,
    pub outline: Color,
    pub size: u32,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            font: FontFamily::Impact,
            fill: Color::WHITE,
            outline: Color::BLACK,
            size: DEFAULT_TEXT_SIZE,
        }
    }
}

impl StyleSettings {
    /// Set the text size, clamped to the slider bounds.
    pub fn set_size(&mut self, size: u32) {
        self.size = size.clamp(MIN_TEXT_SIZE, MAX_TEXT_SIZE);
    }
}

/// Partial style change; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleUpdate {
    pub font: Option<FontFamily>,
    pub fill: Option<Color>,
    pub outline: Option<Color>,
    pub size: Option<u32>,
}

impl StyleSettings {
    pub fn apply(&mut self, update: &StyleUpdate) {
        if let Some(font) = update.font {
            self.font = font;
        }
        if let Some(fill) = update.fill {
            self.fill = fill;
        }
        if let Some(outline) = update.outline {
            self.outline = outline;
        }
        if let Some(size) = update.size {
            self.set_size(size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!("#ff0000".parse::<Color>().unwrap(), Color::rgb(255, 0, 0));
        assert_eq!("#0f0".parse::<Color>().unwrap(), Color::rgb(0, 255, 0));
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gggggg".parse::<Color>().is_err());
    }

    #[test]
    fn test_parse_named_colors() {
        assert_eq!("White".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!(" black ".parse::<Color>().unwrap(), Color::BLACK);
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_serde_hex() {
        let json = serde_json::to_string(&Color::rgb(255, 215, 0)).unwrap();
        assert_eq!(json, "\"#ffd700\"");
        let back: Color = serde_json::from_str("\"gold\"").unwrap();
        assert_eq!(back, Color::rgb(255, 215, 0));
    }

    #[test]
    fn test_size_is_clamped() {
        let mut style = StyleSettings::default();
        style.set_size(5);
        assert_eq!(style.size, MIN_TEXT_SIZE);
        style.set_size(500);
        assert_eq!(style.size, MAX_TEXT_SIZE);
        style.set_size(64);
        assert_eq!(style.size, 64);
    }

    #[test]
    fn test_font_family_roundtrip_names() {
        for font in FontFamily::all() {
            assert_eq!(font.name().parse::<FontFamily>().unwrap(), *font);
        }
        assert!("wingdings".parse::<FontFamily>().is_err());
    }

    #[test]
    fn test_apply_partial_update() {
        let mut style = StyleSettings::default();
        style.apply(&StyleUpdate {
            font: Some(FontFamily::Times),
            size: Some(1000),
            ..Default::default()
        });
        assert_eq!(style.font, FontFamily::Times);
        assert_eq!(style.size, MAX_TEXT_SIZE);
        assert_eq!(style.fill, Color::WHITE);
    }
}
