//! Document worker - runs in its own thread, one per load

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::locator::DocumentLocator;
use super::request::{Ticket, ViewerRequest, ViewerResponse};
use super::strategy::{DocumentHandle, RenderStrategy, StrategyFault};
use super::surface::RenderedSurface;

/// Name prefix of document worker threads
pub const WORKER_THREAD_PREFIX: &str = "folio-doc-";

/// Whether the calling thread is a document worker. Panics there are caught
/// and reported as a [`StrategyFault::Worker`].
#[must_use]
pub fn is_worker_thread() -> bool {
    std::thread::current()
        .name()
        .is_some_and(|name| name.starts_with(WORKER_THREAD_PREFIX))
}

/// Open the document, render its start unit, then serve render requests
/// until shutdown or until the service drops its sender.
///
/// The worker owns the [`DocumentHandle`] for its whole life; it is released
/// when the worker returns.
pub fn document_worker(
    ticket: Ticket,
    locator: DocumentLocator,
    start_unit: usize,
    strategy: Arc<dyn RenderStrategy>,
    requests: Receiver<ViewerRequest>,
    responses: Sender<ViewerResponse>,
) {
    let opened = guarded(|| open_document(strategy.as_ref(), &locator, start_unit));
    let mut handle = match opened {
        Ok((handle, total_units, start_unit, surface)) => {
            let _ = responses.send(ViewerResponse::Opened {
                ticket,
                total_units,
                start_unit,
                surface,
            });
            handle
        }
        Err(fault) => {
            let _ = responses.send(ViewerResponse::OpenFailed { ticket, fault });
            return;
        }
    };

    for request in requests {
        match request {
            ViewerRequest::Render { ticket, unit } => {
                let response = match guarded(|| strategy.render_unit(&mut handle, unit)) {
                    Ok(surface) => ViewerResponse::Rendered {
                        ticket,
                        unit,
                        surface,
                    },
                    Err(fault) => ViewerResponse::RenderFailed {
                        ticket,
                        unit,
                        fault,
                    },
                };
                if responses.send(response).is_err() {
                    break;
                }
            }

            ViewerRequest::Shutdown => break,
        }
    }

    debug!(
        "Releasing {} (generation {})",
        locator.display_name(),
        ticket.generation.0
    );
}

fn open_document(
    strategy: &dyn RenderStrategy,
    locator: &DocumentLocator,
    start_unit: usize,
) -> Result<(DocumentHandle, usize, usize, RenderedSurface), StrategyFault> {
    let mut handle = strategy.open(locator)?;
    let total_units = strategy.unit_count(&handle).max(1);
    let start_unit = start_unit.clamp(1, total_units);
    let surface = strategy.render_unit(&mut handle, start_unit)?;
    Ok((handle, total_units, start_unit, surface))
}

/// Run strategy code, turning a panic into a fault so the controller never
/// waits on a dead worker.
fn guarded<T>(f: impl FnOnce() -> Result<T, StrategyFault>) -> Result<T, StrategyFault> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "strategy panicked".to_string());
        warn!("Strategy panicked: {message}");
        Err(StrategyFault::Worker(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::format::FormatKind;
    use crate::viewer::request::{Generation, RequestId};

    struct PanickyStrategy;

    impl RenderStrategy for PanickyStrategy {
        fn kind(&self) -> FormatKind {
            FormatKind::PlainText
        }

        fn open(&self, _locator: &DocumentLocator) -> Result<DocumentHandle, StrategyFault> {
            Ok(DocumentHandle::Eager("ok".into()))
        }

        fn unit_count(&self, _handle: &DocumentHandle) -> usize {
            3
        }

        fn render_unit(
            &self,
            _handle: &mut DocumentHandle,
            unit: usize,
        ) -> Result<RenderedSurface, StrategyFault> {
            if unit == 2 {
                panic!("unit two is cursed");
            }
            Ok(RenderedSurface::Markup(format!("<p>{unit}</p>")))
        }
    }

    fn ticket(id: u64) -> Ticket {
        Ticket {
            generation: Generation(1),
            id: RequestId::new(id),
        }
    }

    #[test]
    fn worker_threads_are_recognized_by_name() {
        assert!(!is_worker_thread());

        let named = std::thread::Builder::new()
            .name(format!("{WORKER_THREAD_PREFIX}7"))
            .spawn(is_worker_thread)
            .unwrap();
        assert!(named.join().unwrap());

        let other = std::thread::Builder::new()
            .name("folio-ui".into())
            .spawn(is_worker_thread)
            .unwrap();
        assert!(!other.join().unwrap());
    }

    #[test]
    fn panicking_render_becomes_a_fault() {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        let locator = DocumentLocator::new("mem", "txt", "mem");

        request_tx
            .send(ViewerRequest::Render {
                ticket: ticket(2),
                unit: 2,
            })
            .unwrap();
        request_tx.send(ViewerRequest::Shutdown).unwrap();

        document_worker(
            ticket(1),
            locator,
            9,
            Arc::new(PanickyStrategy),
            request_rx,
            response_tx,
        );

        let responses: Vec<_> = response_rx.drain().collect();
        assert!(matches!(
            responses.as_slice(),
            [
                ViewerResponse::Opened {
                    total_units: 3,
                    start_unit: 3,
                    ..
                },
                ViewerResponse::RenderFailed {
                    unit: 2,
                    fault: StrategyFault::Worker(_),
                    ..
                },
            ]
        ));
    }
}
