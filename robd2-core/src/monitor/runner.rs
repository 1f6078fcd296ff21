use super::{session::MonitoringSession, ReadingOutcome};
use crate::{
    device::{self, DeviceFault, DeviceLink},
    error::Robd2Error,
    logger::PerformanceLogger,
    results::{AltitudeResults, FinalReport},
};
use crossbeam::channel::{self, Receiver, Sender};
use std::{
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};
use tracing::{debug, error, info, warn};

/// Emitted by the ingestion loop, in order.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Reading(ReadingOutcome),
    /// A sampling cycle produced nothing usable. The loop backs off and retries.
    TransportGap(DeviceFault),
    Completed(FinalReport),
}

struct Worker<L> {
    session: MonitoringSession,
    link: L,
    logger: Option<PerformanceLogger>,
}

impl<L: DeviceLink> Worker<L> {
    fn run(&mut self, running: &AtomicBool, events: &Sender<MonitorEvent>) {
        let timing = *self.session.timing();
        while running.load(Ordering::SeqCst) {
            let reading = match device::read_reading(
                &mut self.link,
                timing.response_timeout,
                timing.command_gap,
            ) {
                Ok(reading) => reading,
                Err(fault) => {
                    debug!(%fault, "no usable reading this cycle");
                    let _ = events.send(MonitorEvent::TransportGap(fault));
                    thread::sleep(timing.backoff);
                    continue;
                }
            };

            let Some(outcome) = self.session.on_reading(reading) else {
                break;
            };
            if let Some(logger) = self.logger.as_mut() {
                if let Err(e) = logger.log_outcome(&outcome) {
                    warn!(error = %e, "failed to append performance log row");
                }
            }

            let completed = outcome.completed.clone();
            let _ = events.send(MonitorEvent::Reading(outcome));
            if let Some(report) = completed {
                let _ = events.send(MonitorEvent::Completed(report));
                break;
            }
            thread::sleep(timing.sample_interval);
        }
        running.store(false, Ordering::SeqCst);
    }
}

enum Slot<L> {
    Idle(Box<Worker<L>>),
    Running(JoinHandle<Box<Worker<L>>>),
    Lost,
}

/// Runs a [`MonitoringSession`] against a [`DeviceLink`] on its own thread.
///
/// The session moves into the worker while running and comes back when the
/// worker exits, so results are only readable between runs. Live data is
/// delivered on the receiver returned by [`Self::start`], one channel per run.
pub struct MonitorRunner<L: DeviceLink + 'static> {
    slot: Slot<L>,
    running: Arc<AtomicBool>,
}

impl<L: DeviceLink + 'static> MonitorRunner<L> {
    pub(super) fn new(session: MonitoringSession, link: L, logger: Option<PerformanceLogger>) -> Self {
        Self {
            slot: Slot::Idle(Box::new(Worker {
                session,
                link,
                logger,
            })),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the ingestion loop and returns the receiver for this run's
    /// events. Returns `Ok(None)`, with a warning, when it is already running.
    ///
    /// Events are dropped once the receiver is dropped.
    pub fn start(&mut self) -> Result<Option<Receiver<MonitorEvent>>, Robd2Error> {
        if self.running.load(Ordering::SeqCst) {
            warn!("Monitoring is already running");
            return Ok(None);
        }
        self.reclaim()?;

        let Slot::Idle(mut worker) = mem::replace(&mut self.slot, Slot::Lost) else {
            return Err(Robd2Error::WorkerPanicked("monitoring"));
        };
        worker.session.start();
        self.running.store(true, Ordering::SeqCst);

        let (events_tx, events_rx) = channel::unbounded();
        let running = Arc::clone(&self.running);
        self.slot = Slot::Running(thread::spawn(move || {
            worker.run(&running, &events_tx);
            worker
        }));
        Ok(Some(events_rx))
    }

    /// Signals the loop to stop and waits for it. Returns `Ok(false)`, with a
    /// warning, when nothing was running.
    ///
    /// A worker that already finished on its own is reclaimed quietly.
    pub fn stop(&mut self) -> Result<bool, Robd2Error> {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let had_worker = matches!(self.slot, Slot::Running(_));
        self.reclaim()?;
        if !was_running {
            if !had_worker {
                warn!("Monitoring is not running");
            }
            return Ok(false);
        }
        info!("Monitoring runner stopped");
        Ok(true)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The last final report; `None` while running.
    pub fn final_report(&self) -> Option<&FinalReport> {
        match &self.slot {
            Slot::Idle(worker) => worker.session.final_report(),
            _ => None,
        }
    }

    /// Per-altitude results of the last run; `None` while running.
    pub fn altitude_results(&self) -> Option<&AltitudeResults> {
        match &self.slot {
            Slot::Idle(worker) => Some(worker.session.results()),
            _ => None,
        }
    }

    /// Takes the session back from a finished worker.
    fn reclaim(&mut self) -> Result<(), Robd2Error> {
        match mem::replace(&mut self.slot, Slot::Lost) {
            Slot::Running(handle) => match handle.join() {
                Ok(mut worker) => {
                    if worker.session.is_running() {
                        worker.session.stop();
                    }
                    self.slot = Slot::Idle(worker);
                    Ok(())
                }
                Err(_) => {
                    error!("monitoring worker panicked");
                    Err(Robd2Error::WorkerPanicked("monitoring"))
                }
            },
            Slot::Idle(worker) => {
                self.slot = Slot::Idle(worker);
                Ok(())
            }
            Slot::Lost => Err(Robd2Error::WorkerPanicked("monitoring")),
        }
    }
}

impl<L: DeviceLink + 'static> Drop for MonitorRunner<L> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Slot::Running(handle) = mem::replace(&mut self.slot, Slot::Lost) {
            let _ = handle.join();
        }
    }
}
