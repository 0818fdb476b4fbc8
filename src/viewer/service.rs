//! Viewer service - drives the controller and its document workers

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::controller::{Effect, ViewerController, ViewerOptions, ViewerState};
use super::format::FormatRegistry;
use super::locator::DocumentLocator;
use super::request::{ViewerRequest, ViewerResponse};
use super::strategy::StrategyFault;
use super::worker::{WORKER_THREAD_PREFIX, document_worker};

/// Runs the effects a [`ViewerController`] emits.
///
/// Every load gets its own worker thread holding the document handle. A
/// superseded worker is told to shut down and its sender dropped, so a load
/// stuck in a slow fetch never blocks the next document. Whatever it still
/// sends back carries an old generation and is discarded by the controller.
pub struct ViewerService {
    controller: ViewerController,
    registry: Arc<FormatRegistry>,
    request_tx: Option<Sender<ViewerRequest>>,
    response_tx: Sender<ViewerResponse>,
    response_rx: Receiver<ViewerResponse>,
}

impl ViewerService {
    #[must_use]
    pub fn new(registry: Arc<FormatRegistry>, options: ViewerOptions) -> Self {
        let (response_tx, response_rx) = flume::unbounded();
        Self {
            controller: ViewerController::new(options),
            registry,
            request_tx: None,
            response_tx,
            response_rx,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &ViewerController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewerController {
        &mut self.controller
    }

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        self.controller.state()
    }

    pub fn set_on_page_change(&mut self, callback: impl FnMut(usize, usize) + 'static) {
        self.controller.set_on_page_change(callback);
    }

    pub fn load(&mut self, locator: DocumentLocator) {
        let effects = self.controller.load(locator);
        self.execute_effects(effects);
    }

    pub fn next(&mut self) {
        let effects = self.controller.next();
        self.execute_effects(effects);
    }

    pub fn previous(&mut self) {
        let effects = self.controller.previous();
        self.execute_effects(effects);
    }

    pub fn jump_to(&mut self, unit: usize) {
        let effects = self.controller.jump_to(unit);
        self.execute_effects(effects);
    }

    pub fn unload(&mut self) {
        let effects = self.controller.unload();
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Open {
                    ticket,
                    locator,
                    kind,
                    start_unit,
                } => {
                    self.release_worker();

                    let strategy = self.registry.strategy_for(kind);
                    let (request_tx, request_rx) = flume::unbounded();
                    let response_tx = self.response_tx.clone();

                    let spawned = std::thread::Builder::new()
                        .name(format!("{WORKER_THREAD_PREFIX}{}", ticket.generation.0))
                        .spawn(move || {
                            document_worker(
                                ticket,
                                locator,
                                start_unit,
                                strategy,
                                request_rx,
                                response_tx,
                            );
                        });

                    match spawned {
                        Ok(_) => self.request_tx = Some(request_tx),
                        Err(e) => {
                            warn!("Failed to spawn document worker: {e}");
                            let _ = self.response_tx.send(ViewerResponse::OpenFailed {
                                ticket,
                                fault: StrategyFault::Worker(e.to_string()),
                            });
                        }
                    }
                }

                Effect::Render { ticket, unit } => {
                    let sent = self
                        .request_tx
                        .as_ref()
                        .is_some_and(|tx| tx.send(ViewerRequest::Render { ticket, unit }).is_ok());
                    if !sent {
                        let _ = self.response_tx.send(ViewerResponse::RenderFailed {
                            ticket,
                            unit,
                            fault: StrategyFault::Worker("document worker is gone".into()),
                        });
                    }
                }

                Effect::Release => self.release_worker(),
            }
        }
    }

    /// Apply every response that has already arrived. Returns how many were
    /// applied (stale ones are not counted).
    pub fn poll_responses(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(response) = self.response_rx.try_recv() {
            if self.controller.apply(response) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until no load or render is pending, or the timeout elapses.
    /// Returns `true` when the controller is idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.controller.is_busy() {
            match self.response_rx.recv_deadline(deadline) {
                Ok(response) => {
                    self.controller.apply(response);
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        self.poll_responses();
        !self.controller.is_busy()
    }

    /// Receiver for hosts that want to select on worker output
    #[must_use]
    pub fn response_receiver(&self) -> &Receiver<ViewerResponse> {
        &self.response_rx
    }

    /// Stop the current worker
    pub fn shutdown(&mut self) {
        self.release_worker();
    }

    fn release_worker(&mut self) {
        if let Some(tx) = self.request_tx.take() {
            debug!("Shutting down document worker");
            let _ = tx.send(ViewerRequest::Shutdown);
        }
    }
}

impl Drop for ViewerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
