use crate::debug_log;
use crate::models::{CardDetails, RecognizedText, ScannerConfiguration};
use crate::processing::SingleFrameCardScanner;
use crate::scan_optimizer::CardDetailsScanOptimizer;
use crate::utils::{Result, ScanError};
use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;

pub type OnCardScanned = Box<dyn FnOnce(CardDetails) + Send>;
pub type OnCardScanFailed = Box<dyn FnOnce() + Send>;

/// What happened to a single delivered frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No filter matched anything.
    NoMatch,
    /// Something was found and counted; the session goes on.
    Collected,
    /// This frame made the session ready and the success callback fired.
    Finished(CardDetails),
    /// The session had already ended.
    Ignored,
}

struct Callbacks {
    on_card_scanned: OnCardScanned,
    on_card_scan_failed: OnCardScanFailed,
}

enum Finish {
    Scanned(CardDetails),
    Failed,
    Cancelled,
}

struct SessionCore {
    options: ScannerConfiguration,
    scanner: SingleFrameCardScanner,
    optimizer: Mutex<CardDetailsScanOptimizer>,
    finalized: AtomicBool,
    callbacks: Mutex<Option<Callbacks>>,
    // Dropped on finalize; every helper thread selects on the paired receiver.
    finished_tx: Mutex<Option<Sender<()>>>,
}

impl SessionCore {
    fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    fn process_frame(&self, text: &RecognizedText) -> FrameOutcome {
        if self.is_finalized() {
            return FrameOutcome::Ignored;
        }

        let Some(partial) = self.scanner.scan_single_frame(text) else {
            return FrameOutcome::NoMatch;
        };

        let ready = {
            let mut optimizer = self.optimizer.lock();
            if self.is_finalized() {
                return FrameOutcome::Ignored;
            }
            optimizer.ingest(partial);
            if !optimizer.is_ready_to_finish_scan() {
                return FrameOutcome::Collected;
            }
            optimizer.get_optimal_card_details()
        };

        match ready {
            Some(details) => {
                if self.finish(Finish::Scanned(details.clone())) {
                    FrameOutcome::Finished(details)
                } else {
                    FrameOutcome::Ignored
                }
            }
            None => FrameOutcome::Collected,
        }
    }

    fn on_deadline(&self) {
        debug_log!(self.options, "Card scanner timeout reached");
        let best = self.optimizer.lock().get_optimal_card_details();
        match best {
            Some(details) => {
                self.finish(Finish::Scanned(details));
            }
            None => {
                self.finish(Finish::Failed);
            }
        }
    }

    /// Only the first caller gets through; everyone else sees `false`.
    fn finish(&self, finish: Finish) -> bool {
        if self
            .finalized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.finished_tx.lock().take();
        let callbacks = self.callbacks.lock().take();

        match finish {
            Finish::Scanned(details) => {
                debug_log!(self.options, "OPTIMAL Card details: {}", details);
                if let Some(callbacks) = callbacks {
                    (callbacks.on_card_scanned)(details);
                }
            }
            Finish::Failed => {
                debug_log!(self.options, "Card scan failed: no usable observation");
                if let Some(callbacks) = callbacks {
                    (callbacks.on_card_scan_failed)();
                }
            }
            Finish::Cancelled => {
                debug_log!(self.options, "Card scan stopped");
            }
        }
        true
    }
}

/// One bounded-time card scan: frames in, exactly one callback out.
pub struct ScanSession {
    core: Arc<SessionCore>,
    finished_rx: Receiver<()>,
}

impl ScanSession {
    /// Validates `options` and arms the deadline from `timeout_seconds`.
    pub fn start<S, F>(
        options: ScannerConfiguration,
        on_card_scanned: S,
        on_card_scan_failed: F,
    ) -> Result<ScanSession>
    where
        S: FnOnce(CardDetails) + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let deadline = options.timeout().map(crossbeam_channel::after);
        Self::create(options, deadline, on_card_scanned, on_card_scan_failed)
    }

    /// Like [`ScanSession::start`] but the deadline fires when `deadline`
    /// yields, ignoring `timeout_seconds`. A disconnected deadline never fires.
    pub fn start_with_deadline<S, F>(
        options: ScannerConfiguration,
        deadline: Receiver<Instant>,
        on_card_scanned: S,
        on_card_scan_failed: F,
    ) -> Result<ScanSession>
    where
        S: FnOnce(CardDetails) + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        Self::create(options, Some(deadline), on_card_scanned, on_card_scan_failed)
    }

    fn create<S, F>(
        options: ScannerConfiguration,
        deadline: Option<Receiver<Instant>>,
        on_card_scanned: S,
        on_card_scan_failed: F,
    ) -> Result<ScanSession>
    where
        S: FnOnce(CardDetails) + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        options.validate()?;

        let scanner = SingleFrameCardScanner::new(&options)?;
        let optimizer = CardDetailsScanOptimizer::new(&options);
        let (finished_tx, finished_rx) = crossbeam_channel::bounded::<()>(0);

        let core = Arc::new(SessionCore {
            options,
            scanner,
            optimizer: Mutex::new(optimizer),
            finalized: AtomicBool::new(false),
            callbacks: Mutex::new(Some(Callbacks {
                on_card_scanned: Box::new(on_card_scanned),
                on_card_scan_failed: Box::new(on_card_scan_failed),
            })),
            finished_tx: Mutex::new(Some(finished_tx)),
        });

        if let Some(deadline) = deadline {
            spawn_deadline(Arc::downgrade(&core), deadline, finished_rx.clone())?;
        }

        Ok(ScanSession { core, finished_rx })
    }

    /// Scans one frame and feeds the result to the optimizer. Fires the
    /// success callback as soon as the optimizer is ready.
    pub fn process_frame(&self, text: &RecognizedText) -> FrameOutcome {
        self.core.process_frame(text)
    }

    /// Processes frames from `frames` one at a time on a dedicated thread
    /// until the channel closes or the session ends.
    pub fn spawn_frame_loop(&self, frames: Receiver<RecognizedText>) -> Result<JoinHandle<()>> {
        let core = Arc::clone(&self.core);
        let finished = self.finished_rx.clone();

        thread::Builder::new()
            .name("cardscan-frames".to_string())
            .spawn(move || loop {
                select! {
                    recv(frames) -> frame => match frame {
                        Ok(text) => {
                            core.process_frame(&text);
                        }
                        Err(_) => break,
                    },
                    recv(finished) -> _ => break,
                }
            })
            .map_err(ScanError::ThreadSpawn)
    }

    /// Cancels the session: disarms the deadline and suppresses callbacks.
    /// Returns `false` if the session had already ended.
    pub fn stop(&self) -> bool {
        self.core.finish(Finish::Cancelled)
    }

    pub fn is_finalized(&self) -> bool {
        self.core.is_finalized()
    }

    /// Current best-effort result, without ending the session.
    pub fn optimal_card_details(&self) -> Option<CardDetails> {
        self.core.optimizer.lock().get_optimal_card_details()
    }

    pub fn options(&self) -> &ScannerConfiguration {
        &self.core.options
    }
}

fn spawn_deadline(
    core: Weak<SessionCore>,
    deadline: Receiver<Instant>,
    finished: Receiver<()>,
) -> Result<()> {
    thread::Builder::new()
        .name("cardscan-deadline".to_string())
        .spawn(move || {
            select! {
                recv(deadline) -> fired => {
                    if fired.is_ok() {
                        if let Some(core) = core.upgrade() {
                            core.on_deadline();
                        }
                    }
                }
                recv(finished) -> _ => {}
            }
        })
        .map(|_| ())
        .map_err(ScanError::ThreadSpawn)
}
