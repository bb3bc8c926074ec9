use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::application::handlers::message_dispatcher::MessageDispatcher;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(20);

const ERROR_CHANNEL_CAPACITY: usize = 8;

struct ActiveRun {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct RunState {
    generation: u64,
    active: Option<ActiveRun>,
}

/// Owns the periodic dispatch loop. At most one run is active at a time;
/// starting while a run is active replaces it. Run state is shared between
/// the external start/stop calls and the loop's own exit path, so it lives
/// behind a mutex.
pub struct DispatchScheduler {
    dispatcher: Arc<MessageDispatcher>,
    tick_interval: Duration,
    state: Arc<Mutex<RunState>>,
}

impl DispatchScheduler {
    pub fn new(dispatcher: Arc<MessageDispatcher>, tick_interval: Duration) -> Self {
        Self {
            dispatcher,
            tick_interval,
            state: Arc::new(Mutex::new(RunState::default())),
        }
    }

    /// Stops any previous run first (a stop failure is only logged), then
    /// spawns a fresh dispatch loop and its error-draining task. The first
    /// pass runs immediately; subsequent passes run once per tick. Always
    /// yields exactly one active run.
    pub async fn start(&self, caller: CancellationToken) -> anyhow::Result<()> {
        if let Err(err) = self.stop().await {
            error!(error = %err, "failed to stop previous scheduler run");
        }

        let cancel = CancellationToken::new();
        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.active = Some(ActiveRun {
                generation: state.generation,
                cancel: cancel.clone(),
            });
            state.generation
        };

        let (err_tx, mut err_rx) = mpsc::channel::<anyhow::Error>(ERROR_CHANNEL_CAPACITY);

        // Drains pass errors until the dispatch loop drops its sender.
        tokio::spawn(async move {
            while let Some(err) = err_rx.recv().await {
                error!(error = %err, "dispatch pass failed");
            }
        });

        let dispatcher = self.dispatcher.clone();
        let state = self.state.clone();
        let tick_interval = self.tick_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            // An overrunning pass delays the next tick instead of bursting.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    // The first tick completes immediately.
                    _ = ticker.tick() => {
                        if let Err(err) = dispatcher.run_pass().await {
                            let _ = err_tx.send(err).await;
                        }
                    }
                    _ = cancel.cancelled() => break,
                    _ = caller.cancelled() => break,
                }
            }

            // Clear only state that still belongs to this run; a newer start
            // may have replaced it already.
            let mut state = state.lock().await;
            if state
                .active
                .as_ref()
                .is_some_and(|run| run.generation == generation)
            {
                state.active = None;
            }
            info!("dispatch loop stopped");
            // Dropping err_tx closes the channel and ends the drain task.
        });

        info!(interval_secs = self.tick_interval.as_secs(), "dispatch scheduler started");
        Ok(())
    }

    /// No-op when not running.
    pub async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(run) = state.active.take() {
            run.cancel.cancel();
            info!("dispatch scheduler stopped");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.active.is_some()
    }
}
