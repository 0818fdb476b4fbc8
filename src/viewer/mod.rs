//! Multi-format document viewer
//!
//! A [`ViewerService`] resolves a render strategy from a document's declared
//! format, opens the document on a worker thread and exposes unit-based
//! navigation through its [`ViewerController`].

mod controller;
mod engine;
mod fetch;
mod format;
mod locator;
mod request;
mod service;
pub mod strategies;
mod strategy;
mod surface;
mod worker;

pub use controller::{
    DEFAULT_FONT_SIZE, Effect, MAX_FONT_SIZE, MIN_FONT_SIZE, PageChangeCallback, Phase,
    ViewerController, ViewerOptions, ViewerState,
};
pub use engine::{DEFAULT_PDF_SCALE, EngineConfig, EngineConfigError, config, configure};
pub use fetch::{DefaultFetcher, DocumentFetcher, FetchError};
pub use format::{FormatKind, FormatRegistry, SUPPORTED_FORMATS};
pub use locator::DocumentLocator;
pub use request::{Generation, RequestId, Ticket, ViewerRequest, ViewerResponse};
pub use service::ViewerService;
pub use strategy::{DocumentHandle, RenderStrategy, StrategyFault};
pub use surface::{
    ActiveSurface, DisplaySurfaces, MarkupContainer, RasterFrame, RasterTarget, RenderedSurface,
    SurfaceError,
};
pub use worker::{WORKER_THREAD_PREFIX, is_worker_thread};
