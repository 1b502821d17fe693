use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::runtime::Handle;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::status::StatusReporter;

use super::ticket::{ActionTicket, IdempotencyScope};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;
pub type ActionBody = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

#[derive(Clone)]
struct RegisteredAction {
    scope: IdempotencyScope,
    body: ActionBody,
}

#[derive(Default)]
struct DispatcherInner {
    actions: Mutex<HashMap<String, RegisteredAction>>,
    tickets: Mutex<HashMap<String, ActionTicket>>,
    // serializes close/wait/reopen on the shared tracker
    idle: tokio::sync::Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl DispatcherInner {
    fn mark_completed(&self, name: &str, cancelled: bool) {
        if let Some(ticket) = lock(&self.tickets).get_mut(name) {
            ticket.finish(cancelled);
        }
    }
}

/// Runs named side-effect actions at most once per scope, each on its own
/// tokio task. Requests never block on the action body.
#[derive(Clone)]
pub struct TaskDispatcher {
    inner: Arc<DispatcherInner>,
    runtime: Handle,
    tracker: TaskTracker,
    cancel_token: CancellationToken,
    status: StatusReporter,
}

impl TaskDispatcher {
    pub fn new(runtime: Handle, status: StatusReporter) -> Self {
        Self {
            inner: Arc::new(DispatcherInner::default()),
            runtime,
            tracker: TaskTracker::new(),
            cancel_token: CancellationToken::new(),
            status,
        }
    }

    pub fn register<F, Fut>(&self, name: &str, scope: IdempotencyScope, body: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let body: ActionBody = Arc::new(move || Box::pin(body()) as ActionFuture);
        lock(&self.inner.actions).insert(name.to_string(), RegisteredAction { scope, body });
    }

    /// Starts `name` unless its ticket is already started. Returns whether this
    /// call actually scheduled a run.
    pub fn request_once(&self, name: &str) -> bool {
        if self.cancel_token.is_cancelled() {
            log_warn!("dispatcher shut down; ignoring request for {}", name);
            return false;
        }

        let Some(action) = lock(&self.inner.actions).get(name).cloned() else {
            log_warn!("no action registered under {}", name);
            return false;
        };

        {
            let mut tickets = lock(&self.inner.tickets);
            let ticket = tickets
                .entry(name.to_string())
                .or_insert_with(|| ActionTicket::new(name, action.scope));
            if ticket.started {
                log::trace!("action {} already started; skipping", name);
                return false;
            }
            ticket.started = true;
        }

        self.spawn_worker(name.to_string(), action.body);
        true
    }

    fn spawn_worker(&self, name: String, body: ActionBody) {
        let inner = Arc::clone(&self.inner);
        let status = self.status.clone();
        let cancel_token = self.cancel_token.clone();

        log_info!("starting action {}", name);
        self.tracker.spawn_on(
            async move {
                let outcome = tokio::select! {
                    result = body() => Some(result),
                    _ = cancel_token.cancelled() => None,
                };

                let cancelled = outcome.is_none();
                match outcome {
                    Some(Ok(())) => log_info!("action {} completed", name),
                    Some(Err(err)) => {
                        log_error!("action {} failed: {err:#}", name);
                        status.set(format!("{name} failed: {err:#}"));
                    }
                    None => log_warn!("action {} cancelled", name),
                }

                // A failed run stays started until an episode reset; there is
                // no retry. A cancelled run stays started for good.
                inner.mark_completed(&name, cancelled);
            },
            &self.runtime,
        );
    }

    /// Runs a background job without a ticket. Errors are logged and otherwise
    /// dropped.
    pub fn fire_and_forget<Fut>(&self, label: &'static str, job: Fut)
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.cancel_token.is_cancelled() {
            return;
        }

        let cancel_token = self.cancel_token.clone();
        self.tracker.spawn_on(
            async move {
                tokio::select! {
                    result = job => {
                        if let Err(err) = result {
                            log_warn!("{} failed: {err:#}", label);
                        }
                    }
                    _ = cancel_token.cancelled() => {}
                }
            },
            &self.runtime,
        );
    }

    /// Clears finished per-episode tickets and returns how many were cleared.
    /// Tickets still running are re-armed when their run finishes. Does
    /// nothing after shutdown.
    pub fn reset_episode_scoped_tickets(&self) -> usize {
        if self.cancel_token.is_cancelled() {
            log_warn!("dispatcher shut down; episode reset ignored");
            return 0;
        }

        let mut tickets = lock(&self.inner.tickets);
        let mut reset = 0;
        for ticket in tickets.values_mut() {
            if ticket.reset_for_new_episode() {
                reset += 1;
            } else if ticket.reset_pending {
                log_info!("action {} still running; re-arming it once finished", ticket.name);
            }
        }
        reset
    }

    pub fn ticket(&self, name: &str) -> Option<ActionTicket> {
        lock(&self.inner.tickets).get(name).cloned()
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every spawned worker has finished. Overlapping callers
    /// take turns.
    pub async fn wait_idle(&self) {
        let _idle = self.inner.idle.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancels in-flight workers and refuses new requests.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        self.wait_idle().await;
        log_info!("dispatcher shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn dispatcher() -> (TaskDispatcher, StatusReporter) {
        let status = StatusReporter::new();
        (TaskDispatcher::new(Handle::current(), status.clone()), status)
    }

    #[tokio::test]
    async fn repeated_requests_schedule_one_worker() {
        let (dispatcher, _) = dispatcher();
        let runs = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        {
            let runs = Arc::clone(&runs);
            let release = Arc::clone(&release);
            dispatcher.register("capture-sound", IdempotencyScope::PerEpisode, move || {
                let runs = Arc::clone(&runs);
                let release = Arc::clone(&release);
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                    Ok(())
                }
            });
        }

        assert!(dispatcher.request_once("capture-sound"));
        assert!(!dispatcher.request_once("capture-sound"));
        assert!(!dispatcher.request_once("capture-sound"));

        let ticket = dispatcher.ticket("capture-sound").unwrap();
        assert!(ticket.in_flight());

        release.notify_one();
        dispatcher.wait_idle().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        let ticket = dispatcher.ticket("capture-sound").unwrap();
        assert!(ticket.started && ticket.completed);
        assert!(!dispatcher.request_once("capture-sound"));
    }

    #[tokio::test]
    async fn failure_updates_status_and_keeps_ticket_started() {
        let (dispatcher, status) = dispatcher();
        dispatcher.register("notify-captured", IdempotencyScope::PerEpisode, || async {
            Err(anyhow!("connection refused"))
        });

        assert!(dispatcher.request_once("notify-captured"));
        dispatcher.wait_idle().await;

        let ticket = dispatcher.ticket("notify-captured").unwrap();
        assert!(ticket.started);
        assert!(ticket.completed);
        assert_eq!(status.current(), "notify-captured failed: connection refused");
        assert!(!dispatcher.request_once("notify-captured"));
    }

    #[tokio::test]
    async fn unregistered_action_is_skipped() {
        let (dispatcher, _) = dispatcher();
        assert!(!dispatcher.request_once("missing"));
        assert!(dispatcher.ticket("missing").is_none());
    }

    #[tokio::test]
    async fn episode_reset_only_touches_finished_episode_tickets() {
        let (dispatcher, _) = dispatcher();
        let release = Arc::new(Notify::new());

        dispatcher.register("approach-sound", IdempotencyScope::PerEpisode, || async { Ok(()) });
        dispatcher.register("notify-intruder", IdempotencyScope::PerProcess, || async { Ok(()) });
        {
            let release = Arc::clone(&release);
            dispatcher.register("capture-and-notify", IdempotencyScope::PerEpisode, move || {
                let release = Arc::clone(&release);
                async move {
                    release.notified().await;
                    Ok(())
                }
            });
        }

        assert!(dispatcher.request_once("approach-sound"));
        assert!(dispatcher.request_once("notify-intruder"));
        assert!(dispatcher.request_once("capture-and-notify"));

        // let the two quick actions finish
        while dispatcher.ticket("approach-sound").map(|t| !t.completed).unwrap_or(true)
            || dispatcher.ticket("notify-intruder").map(|t| !t.completed).unwrap_or(true)
        {
            tokio::task::yield_now().await;
        }

        assert_eq!(dispatcher.reset_episode_scoped_tickets(), 1);
        assert!(dispatcher.request_once("approach-sound"));
        assert!(!dispatcher.request_once("notify-intruder"));

        // still running: no second instance, but armed again once it ends
        assert!(!dispatcher.request_once("capture-and-notify"));
        assert!(dispatcher.ticket("capture-and-notify").unwrap().reset_pending);

        release.notify_one();
        dispatcher.wait_idle().await;

        let ticket = dispatcher.ticket("capture-and-notify").unwrap();
        assert!(!ticket.started && !ticket.reset_pending);
        assert!(dispatcher.request_once("capture-and-notify"));

        release.notify_one();
        dispatcher.wait_idle().await;
    }

    #[test]
    fn concurrent_requests_trigger_exactly_once() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dispatcher = TaskDispatcher::new(runtime.handle().clone(), StatusReporter::new());
        dispatcher.register("notify-intruder", IdempotencyScope::PerProcess, || async { Ok(()) });

        let winners = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if dispatcher.request_once("notify-intruder") {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        runtime.block_on(dispatcher.wait_idle());
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_cancels_without_rerun() {
        let (dispatcher, _) = dispatcher();
        dispatcher.register("capture-and-notify", IdempotencyScope::PerEpisode, || async {
            std::future::pending::<()>().await;
            Ok(())
        });

        assert!(dispatcher.request_once("capture-and-notify"));
        dispatcher.shutdown().await;

        let ticket = dispatcher.ticket("capture-and-notify").unwrap();
        assert!(ticket.started && ticket.completed);
        assert_eq!(dispatcher.reset_episode_scoped_tickets(), 0);
        assert!(dispatcher.ticket("capture-and-notify").unwrap().started);
        assert!(!dispatcher.request_once("capture-and-notify"));
    }

    #[tokio::test]
    async fn reset_pending_at_shutdown_is_dropped() {
        let (dispatcher, _) = dispatcher();
        dispatcher.register("capture-and-notify", IdempotencyScope::PerEpisode, || async {
            std::future::pending::<()>().await;
            Ok(())
        });

        assert!(dispatcher.request_once("capture-and-notify"));
        assert_eq!(dispatcher.reset_episode_scoped_tickets(), 0);
        dispatcher.shutdown().await;

        let ticket = dispatcher.ticket("capture-and-notify").unwrap();
        assert!(ticket.started && ticket.completed);
        assert!(!ticket.reset_pending);
    }

    #[tokio::test]
    async fn overlapping_wait_idle_callers_both_return() {
        let (dispatcher, _) = dispatcher();
        let release = Arc::new(Notify::new());
        {
            let release = Arc::clone(&release);
            dispatcher.register("capture-and-notify", IdempotencyScope::PerEpisode, move || {
                let release = Arc::clone(&release);
                async move {
                    release.notified().await;
                    Ok(())
                }
            });
        }
        assert!(dispatcher.request_once("capture-and-notify"));

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.wait_idle().await }
        });
        let second = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.shutdown().await }
        });
        tokio::task::yield_now().await;
        release.notify_one();

        let joined = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            first.await.unwrap();
            second.await.unwrap();
        })
        .await;
        assert!(joined.is_ok(), "a wait_idle caller hung");
    }

    #[tokio::test]
    async fn fire_and_forget_errors_do_not_touch_status() {
        let (dispatcher, status) = dispatcher();
        dispatcher.fire_and_forget("position report", async { Err(anyhow!("timeout")) });
        dispatcher.wait_idle().await;
        assert_eq!(status.current(), crate::status::INITIAL_STATUS);
    }
}
