//! Process-wide rendering configuration.
//!
//! Configured once at startup with [`configure`]; read-only afterwards. The
//! first call to [`config`] freezes the defaults if nothing was configured.

use std::sync::OnceLock;

use log::info;

/// Magnification applied to PDF pages when computing the display viewport
pub const DEFAULT_PDF_SCALE: f32 = 1.5;

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// PDF viewport magnification
    pub pdf_scale: f32,
    /// User agent sent with remote document requests
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pdf_scale: DEFAULT_PDF_SCALE,
            user_agent: format!("folio/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineConfigError {
    #[error("rendering engine is already configured")]
    AlreadyConfigured,

    #[error("PDF scale must be a positive finite number, got {0}")]
    InvalidScale(f32),
}

static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

pub fn configure(config: EngineConfig) -> Result<(), EngineConfigError> {
    if !config.pdf_scale.is_finite() || config.pdf_scale <= 0.0 {
        return Err(EngineConfigError::InvalidScale(config.pdf_scale));
    }

    let scale = config.pdf_scale;
    ENGINE_CONFIG
        .set(config)
        .map_err(|_| EngineConfigError::AlreadyConfigured)?;
    info!("Rendering engine configured (pdf scale {scale})");
    Ok(())
}

#[must_use]
pub fn config() -> &'static EngineConfig {
    ENGINE_CONFIG.get_or_init(EngineConfig::default)
}
