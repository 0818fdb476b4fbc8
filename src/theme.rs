use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Reader color themes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
    #[default]
    Light,
    Dark,
    Sepia,
}

/// Colors used by the reader shell for one theme
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub border: Color,
    pub accent: Color,
    pub error: Color,
}

impl ColorTheme {
    pub fn name(&self) -> &'static str {
        match self {
            ColorTheme::Light => "light",
            ColorTheme::Dark => "dark",
            ColorTheme::Sepia => "sepia",
        }
    }

    pub fn all() -> &'static [ColorTheme] {
        &[ColorTheme::Light, ColorTheme::Dark, ColorTheme::Sepia]
    }

    /// Next theme in selector order, wrapping around
    pub fn cycle(self) -> Self {
        match self {
            ColorTheme::Light => ColorTheme::Dark,
            ColorTheme::Dark => ColorTheme::Sepia,
            ColorTheme::Sepia => ColorTheme::Light,
        }
    }

    pub fn palette(&self) -> &'static Palette {
        match self {
            ColorTheme::Light => &LIGHT_PALETTE,
            ColorTheme::Dark => &DARK_PALETTE,
            ColorTheme::Sepia => &SEPIA_PALETTE,
        }
    }
}

impl std::fmt::Display for ColorTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ColorTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(ColorTheme::Light),
            "dark" => Ok(ColorTheme::Dark),
            "sepia" => Ok(ColorTheme::Sepia),
            other => Err(format!(
                "unknown theme '{other}' (expected light, dark or sepia)"
            )),
        }
    }
}

static LIGHT_PALETTE: Palette = Palette {
    background: Color::Rgb(0xFF, 0xFF, 0xFF),
    foreground: Color::Rgb(0x11, 0x18, 0x27),
    muted: Color::Rgb(0x6B, 0x72, 0x80),
    border: Color::Rgb(0xD1, 0xD5, 0xDB),
    accent: Color::Rgb(0x4F, 0x46, 0xE5),
    error: Color::Rgb(0xDC, 0x26, 0x26),
};

static DARK_PALETTE: Palette = Palette {
    background: Color::Rgb(0x11, 0x18, 0x27),
    foreground: Color::Rgb(0xFF, 0xFF, 0xFF),
    muted: Color::Rgb(0x9C, 0xA3, 0xAF),
    border: Color::Rgb(0x37, 0x41, 0x51),
    accent: Color::Rgb(0x81, 0x8C, 0xF8),
    error: Color::Rgb(0xF8, 0x71, 0x71),
};

// amber-50 paper with amber-900 ink
static SEPIA_PALETTE: Palette = Palette {
    background: Color::Rgb(0xFF, 0xFB, 0xEB),
    foreground: Color::Rgb(0x78, 0x35, 0x0F),
    muted: Color::Rgb(0xB4, 0x53, 0x09),
    border: Color::Rgb(0xFD, 0xE6, 0x8A),
    accent: Color::Rgb(0x92, 0x40, 0x0E),
    error: Color::Rgb(0xB9, 0x1C, 0x1C),
};
