//! Cancellable background timer for periodic refreshes.

use std::{future::Future, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// A background timer that runs `tick` every period until stopped or dropped.
#[derive(Debug, Default)]
pub struct PollTask {
    handle: Option<JoinHandle<()>>,
}

impl PollTask {
    /// Starts polling. The first tick fires after one full period. Any
    /// previous timer is stopped first.
    pub fn start<F, Fut>(&mut self, every: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        tracing::debug!(?every, "polling started");
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                tick().await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.stop();
    }
}
