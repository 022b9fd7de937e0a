//! Periodic driver for [`Engine::run_cycle_once`].

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::Engine;

/// Background scan loop with an explicit shutdown path.
///
/// The first cycle runs immediately. A cycle that overruns the period delays
/// the next one instead of triggering a burst of catch-up cycles.
#[derive(Debug)]
pub struct Scheduler {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the loop on the current runtime.
    pub fn start(engine: Arc<Engine>, period: Duration) -> Self {
        let token = CancellationToken::new();
        let child = token.child_token();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs_f64(), "Scan scheduler started");

            loop {
                tokio::select! {
                    biased;

                    () = child.cancelled() => {
                        info!("Scan scheduler stopping");
                        break;
                    }

                    _ = ticker.tick() => {
                        match engine.run_cycle_once().await {
                            Ok(report) => debug!(alerted = report.alerted.len(), "Scheduled cycle finished"),
                            Err(e) => warn!(error = %e, "Scheduled cycle failed, retrying next period"),
                        }
                    }
                }
            }
        });

        Self { token, handle }
    }

    /// Token that stops the loop when cancelled.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the loop and wait for an in-flight cycle to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Scan scheduler task ended abnormally");
        }
    }
}
