//! Worker request and response types

use super::strategy::StrategyFault;
use super::surface::RenderedSurface;

/// Unique identifier for worker requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Counts document loads. Every new locator starts a new generation and
/// everything tagged with an older one is stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Identifies a request and the document generation it belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub generation: Generation,
    pub id: RequestId,
}

/// Request sent to a document worker after it has opened its document
#[derive(Debug)]
pub enum ViewerRequest {
    /// Render a unit (1-indexed)
    Render { ticket: Ticket, unit: usize },

    /// Stop the worker and release its document handle
    Shutdown,
}

/// Response from a document worker
#[derive(Debug)]
pub enum ViewerResponse {
    /// Document opened, counted and its start unit rendered
    Opened {
        ticket: Ticket,
        total_units: usize,
        start_unit: usize,
        surface: RenderedSurface,
    },

    /// Opening, counting or the first render failed
    OpenFailed { ticket: Ticket, fault: StrategyFault },

    Rendered {
        ticket: Ticket,
        unit: usize,
        surface: RenderedSurface,
    },

    RenderFailed {
        ticket: Ticket,
        unit: usize,
        fault: StrategyFault,
    },
}

impl ViewerResponse {
    #[must_use]
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::Opened { ticket, .. }
            | Self::OpenFailed { ticket, .. }
            | Self::Rendered { ticket, .. }
            | Self::RenderFailed { ticket, .. } => *ticket,
        }
    }
}
