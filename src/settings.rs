use anyhow::Context;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, PoisonError, RwLock};

use crate::theme::ColorTheme;
use crate::viewer::{DEFAULT_FONT_SIZE, DEFAULT_PDF_SCALE, MAX_FONT_SIZE, MIN_FONT_SIZE};

pub const CURRENT_VERSION: u32 = 2;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "folio";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub theme: ColorTheme,

    #[serde(default = "default_font_size")]
    pub font_size: u16,

    #[serde(default = "default_pdf_scale")]
    pub pdf_scale: f32,

    /// Directory listed when no document is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_dir: Option<PathBuf>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_font_size() -> u16 {
    DEFAULT_FONT_SIZE
}

fn default_pdf_scale() -> f32 {
    DEFAULT_PDF_SCALE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            theme: ColorTheme::default(),
            font_size: default_font_size(),
            pdf_scale: default_pdf_scale(),
            library_dir: None,
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };

    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Err(e) = save_settings_to_file(&current(), &path) {
            error!("{e:#}");
        }
    }
}

/// Load settings from an explicit file into the global store. Parse errors
/// are logged and leave the current settings untouched.
pub fn load_settings_from_path(path: &Path) {
    match read_settings(path) {
        Ok(mut settings) => {
            debug!("Loaded settings from {path:?}");

            if settings.version < CURRENT_VERSION {
                migrate_settings(&mut settings);
                if let Err(e) = save_settings_to_file(&settings, path) {
                    error!("{e:#}");
                }
            }

            *SETTINGS.write().unwrap_or_else(PoisonError::into_inner) = settings;
        }
        Err(e) => error!("{e:#}"),
    }
}

fn read_settings(path: &Path) -> anyhow::Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {path:?}"))?;
    parse_settings(&content).with_context(|| format!("Failed to parse settings file {path:?}"))
}

pub fn parse_settings(content: &str) -> anyhow::Result<Settings> {
    let mut settings: Settings = serde_yaml::from_str(content)?;
    settings.font_size = settings.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    if !settings.pdf_scale.is_finite() || settings.pdf_scale <= 0.0 {
        warn!(
            "Ignoring invalid pdf_scale {}, using {DEFAULT_PDF_SCALE}",
            settings.pdf_scale
        );
        settings.pdf_scale = DEFAULT_PDF_SCALE;
    }
    Ok(settings)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // v1 stored the scale as a percentage
    if settings.version < 2 && settings.pdf_scale > 10.0 {
        settings.pdf_scale /= 100.0;
    }

    settings.version = CURRENT_VERSION;
}

pub fn save_settings() {
    let Some(path) = config_path() else {
        warn!("Could not determine config directory, cannot save settings");
        return;
    };

    if let Err(e) = save_settings_to_file(&current(), &path) {
        error!("{e:#}");
    }
}

fn save_settings_to_file(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {parent:?}"))?;
        }
    }

    let content = generate_settings_yaml(settings)?;
    fs::write(path, content).with_context(|| format!("Failed to save settings to {path:?}"))?;
    debug!("Saved settings to {path:?}");
    Ok(())
}

fn generate_settings_yaml(settings: &Settings) -> anyhow::Result<String> {
    let mut content = String::from(SETTINGS_HEADER);
    content.push_str(&serde_yaml::to_string(settings)?);
    Ok(content)
}

const SETTINGS_HEADER: &str = r#"# folio settings
#
# theme: light | dark | sepia
# font_size: 12..24
# pdf_scale: PDF rasterization scale (read once at startup)
# library_dir: directory listed when no document is given
"#;

// Public API for accessing/modifying settings

/// Snapshot of the current settings
pub fn current() -> Settings {
    SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn get_theme() -> ColorTheme {
    SETTINGS
        .read()
        .map(|s| s.theme)
        .unwrap_or_default()
}

pub fn set_theme(theme: ColorTheme) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.theme = theme;
    }
    save_settings();
}

pub fn get_font_size() -> u16 {
    SETTINGS
        .read()
        .map(|s| s.font_size)
        .unwrap_or(DEFAULT_FONT_SIZE)
}

pub fn set_font_size(font_size: u16) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.font_size = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    }
    save_settings();
}

pub fn get_pdf_scale() -> f32 {
    SETTINGS
        .read()
        .map(|s| s.pdf_scale)
        .unwrap_or(DEFAULT_PDF_SCALE)
}

pub fn get_library_dir() -> Option<PathBuf> {
    SETTINGS.read().ok().and_then(|s| s.library_dir.clone())
}
