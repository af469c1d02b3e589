//! The polling listener.
//!
//! One tokio task per running listener repeats fetch, dedup, notify and
//! sleep. The next tick is only scheduled once the current one has finished
//! notifying, so ticks never overlap and the dedup state has a single writer
//! at a time.
//!
//! A listener shared between callers can be restarted while a previous stop
//! is still winding down. The new task waits on the listener's tick gate
//! until the old one has exited, so at most one tick is ever in flight.
//!
//! Stopping cancels the pending sleep and abandons an in-flight fetch; its
//! results are never delivered. The set of seen ids belongs to the listener,
//! not to the task, so a stopped and restarted listener does not re-deliver
//! messages it already emitted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chat_logging::{chat_debug, chat_error, chat_info, chat_trace, chat_warn};
use livechat_core::{ChatMessage, FetchOptions, ListenerConfig, PollState};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::registry::{ChatObserver, ObserverRegistry};
use crate::source::SnapshotSource;
use crate::{FetchError, ListenerError};

pub struct ChatListener {
    shared: Arc<Shared>,
    task: Mutex<Option<RunningTask>>,
}

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared {
    resource_id: String,
    fetch_options: FetchOptions,
    source: Arc<dyn SnapshotSource>,
    state: Mutex<PollState>,
    registry: Mutex<ObserverRegistry>,
    /// Held by a poll task for its whole lifetime.
    tick_gate: tokio::sync::Mutex<()>,
}

impl ChatListener {
    pub fn new(
        resource_id: impl Into<String>,
        config: ListenerConfig,
        source: Arc<dyn SnapshotSource>,
    ) -> Self {
        let config = config.validated();
        let shared = Shared {
            resource_id: resource_id.into(),
            state: Mutex::new(PollState::new(&config)),
            fetch_options: config.fetch_options,
            source,
            registry: Mutex::new(ObserverRegistry::new()),
            tick_gate: tokio::sync::Mutex::new(()),
        };
        Self {
            shared: Arc::new(shared),
            task: Mutex::new(None),
        }
    }

    /// Registers an observer. Registering the same `Arc` again has no effect.
    pub fn on_message(&self, observer: Arc<dyn ChatObserver>) -> bool {
        lock(&self.shared.registry).register(observer)
    }

    pub fn remove_observer(&self, observer: &Arc<dyn ChatObserver>) -> bool {
        lock(&self.shared.registry).remove(observer)
    }

    /// Registers a handler for fetch and observer failures.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&ListenerError) + Send + Sync + 'static,
    {
        lock(&self.shared.registry).add_error_handler(Arc::new(handler));
    }

    /// Starts polling on the current tokio runtime. No-op while running.
    ///
    /// Returns `false` without starting when called outside a tokio runtime.
    pub fn start(&self) -> bool {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                chat_error!(
                    "Cannot start listener for {}: {}",
                    self.shared.resource_id,
                    err
                );
                return false;
            }
        };

        let mut task = lock(&self.task);
        if task.as_ref().is_some_and(|running| !running.handle.is_finished()) {
            return true;
        }

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(run_loop(self.shared.clone(), cancel.clone()));
        *task = Some(RunningTask { cancel, handle });
        chat_info!("Listener started for {}", self.shared.resource_id);
        true
    }

    /// Stops polling. Once this returns no further fetch or delivery happens.
    /// No-op while stopped.
    pub async fn stop(&self) {
        let running = lock(&self.task).take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if let Err(err) = running.handle.await {
            chat_warn!(
                "Listener task for {} ended abnormally: {}",
                self.shared.resource_id,
                err
            );
        }
        chat_info!("Listener stopped for {}", self.shared.resource_id);
    }

    pub fn is_running(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|running| !running.cancel.is_cancelled() && !running.handle.is_finished())
    }

    /// Switches adaptive pacing on or off and resets the interval to base.
    pub fn set_dynamic_polling(&self, enabled: bool) {
        lock(&self.shared.state).set_dynamic_polling(enabled);
    }

    pub fn current_interval(&self) -> Duration {
        lock(&self.shared.state).current_interval()
    }

    /// Number of message ids currently remembered for dedup.
    pub fn seen_count(&self) -> usize {
        lock(&self.shared.state).seen().len()
    }
}

impl Drop for ChatListener {
    fn drop(&mut self) {
        if let Some(running) = lock(&self.task).take() {
            running.cancel.cancel();
        }
    }
}

async fn run_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let _gate = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        gate = shared.tick_gate.lock() => gate,
    };

    loop {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = shared.source.fetch_messages(&shared.resource_id, &shared.fetch_options) => result,
        };

        let delay = shared.complete_tick(fetched);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

impl Shared {
    /// Admits and delivers one snapshot, then returns the delay until the next tick.
    ///
    /// Each message is recorded as seen right before its observers run.
    fn complete_tick(&self, fetched: Result<Vec<ChatMessage>, FetchError>) -> Duration {
        let registry = lock(&self.registry).clone();

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(err) => {
                chat_warn!("Snapshot fetch for {} failed: {}", self.resource_id, err);
                registry.report(&ListenerError::Fetch(err));
                Vec::new()
            }
        };

        let mut delivered = 0;
        for message in &snapshot {
            let is_new = lock(&self.state).admit(message);
            if !is_new {
                continue;
            }
            delivered += 1;
            chat_trace!("Delivering {} from {}", message.id, message.author);
            for error in registry.deliver(message) {
                chat_warn!("{}", error);
                registry.report(&error);
            }
        }
        chat_debug!(
            "Tick for {}: {} fetched, {} new",
            self.resource_id,
            snapshot.len(),
            delivered
        );

        lock(&self.state).finish_tick(delivered)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
