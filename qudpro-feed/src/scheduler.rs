//! Periodic injection of generated posts into a running feed.

use crate::{
    engine::FeedEngine,
    source::{PersistedSource, SyntheticSource},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background task that pulls one synthetic post per interval and injects it
/// at the top of the feed.
///
/// The first injection happens one full interval after [`start`]. After
/// [`stop`] returns no further injection takes place: a generation still in
/// flight is abandoned and its result never reaches the feed. Dropping the
/// scheduler cancels it as well, without waiting for the task to wind down.
///
/// [`start`]: InjectionScheduler::start
/// [`stop`]: InjectionScheduler::stop
#[derive(Debug)]
pub struct InjectionScheduler {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl InjectionScheduler {
    pub fn start<P, S>(engine: Arc<FeedEngine<P, S>>) -> Self
    where
        P: PersistedSource + Send + Sync + 'static,
        S: SyntheticSource + Send + Sync + 'static,
    {
        let period = engine.config().injection_interval();
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(engine, period, token.clone()));

        info!(?period, "Injection scheduler started");
        Self {
            token,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Cancels the scheduler and waits for its task to finish.
    pub async fn stop(&mut self) {
        self.token.cancel();

        if let Some(handle) = self.handle.take()
            && let Err(err) = handle.await
        {
            warn!(error = %err, "Injection task ended abnormally");
        }
        info!("Injection scheduler stopped");
    }
}

impl Drop for InjectionScheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run<P, S>(engine: Arc<FeedEngine<P, S>>, period: Duration, token: CancellationToken)
where
    P: PersistedSource + Sync,
    S: SyntheticSource + Sync,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let generated = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("Abandoning synthetic post generation on cancellation");
                break;
            }
            generated = engine.generate_injection() => generated,
        };

        match generated {
            Ok(post) => {
                engine.inject_synthetic(post, &token);
            }
            Err(err) => warn!(error = %err, "Could not generate a post to inject"),
        }
    }
}
