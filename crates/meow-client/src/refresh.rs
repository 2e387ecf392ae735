use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::realtime::Subscription;

/// Ticket of one started fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Monotonic request counter. Only the most recently started fetch may
/// publish its result; slower earlier fetches are discarded.
#[derive(Debug, Default)]
pub struct RequestGate {
    latest: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    Loading,
    Ready(T),
    Failed(ClientError),
}

impl<T> PageState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, PageState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            PageState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// A page's fetch-and-derive pipeline kept live by a change subscription.
///
/// The loader runs once at start, again after every debounced change and on
/// [`LiveView::refresh`]. Results are published through a watch channel.
/// Dropping the view aborts in-flight loads and releases the subscription.
pub struct LiveView<T> {
    state: watch::Receiver<PageState<T>>,
    refresh_tx: mpsc::UnboundedSender<()>,
    driver: JoinHandle<()>,
}

impl<T> LiveView<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn spawn<L, Fut>(load: L, subscription: Option<Subscription>, debounce: Duration) -> Self
    where
        L: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::start(load, subscription, None, debounce)
    }

    /// Like [`LiveView::spawn`], but the first load does not wait for
    /// `attach`. Once it yields a subscription the page reloads once to pick
    /// up changes made while subscribing.
    pub fn spawn_attaching<L, Fut, A>(load: L, attach: A, debounce: Duration) -> Self
    where
        L: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        A: Future<Output = Option<Subscription>> + Send + 'static,
    {
        Self::start(load, None, Some(Box::pin(attach)), debounce)
    }

    fn start<L, Fut>(
        load: L,
        subscription: Option<Subscription>,
        attach: Option<BoxFuture<'static, Option<Subscription>>>,
        debounce: Duration,
    ) -> Self
    where
        L: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (state_tx, state) = watch::channel(PageState::Loading);
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(load, subscription, attach, debounce, state_tx, refresh_rx));
        Self {
            state,
            refresh_tx,
            driver,
        }
    }

    pub fn state(&self) -> PageState<T> {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<PageState<T>> {
        self.state.clone()
    }

    /// Re-run the loader now.
    pub fn refresh(&self) {
        let _ = self.refresh_tx.send(());
    }

    /// Wait until the first load has finished.
    pub async fn settled(&self) -> PageState<T> {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| !s.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Publish `next` if `ticket` is still the newest. The check runs under the
/// watch lock, so a newer result that is published concurrently always lands last.
fn publish<T>(state_tx: &watch::Sender<PageState<T>>, gate: &RequestGate, ticket: Ticket, next: PageState<T>) -> bool {
    let mut next = Some(next);
    state_tx.send_if_modified(|state| {
        if !gate.is_current(ticket) {
            return false;
        }
        if let Some(next) = next.take() {
            *state = next;
        }
        true
    })
}

async fn drive<T, L, Fut>(
    load: L,
    mut subscription: Option<Subscription>,
    mut attach: Option<BoxFuture<'static, Option<Subscription>>>,
    debounce: Duration,
    state_tx: watch::Sender<PageState<T>>,
    mut refresh_rx: mpsc::UnboundedReceiver<()>,
) where
    T: Send + Sync + 'static,
    L: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let gate = Arc::new(RequestGate::new());
    let state_tx = Arc::new(state_tx);
    // Dropped with the driver, aborting any load still running
    let mut loads = JoinSet::new();

    let start = |loads: &mut JoinSet<()>| {
        let ticket = gate.begin();
        let gate = gate.clone();
        let state_tx = state_tx.clone();
        let fut = load();
        loads.spawn(async move {
            let next = match fut.await {
                Ok(value) => PageState::Ready(value),
                Err(e) => {
                    warn!("Page load failed: {}", e);
                    PageState::Failed(e)
                }
            };
            if !publish(&state_tx, &gate, ticket, next) {
                debug!("Discarding stale load {:?}", ticket);
            }
        });
    };

    start(&mut loads);

    loop {
        while loads.try_join_next().is_some() {}

        let changed = async {
            match subscription.as_mut() {
                Some(sub) => sub.next_debounced(debounce).await,
                None => std::future::pending().await,
            }
        };

        let attached = async {
            match attach.as_mut() {
                Some(pending) => pending.await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            sub = attached => {
                attach = None;
                if sub.is_some() {
                    debug!("Change feed attached, catching up");
                    subscription = sub;
                    start(&mut loads);
                }
            }
            change = changed => match change {
                Some(change) => {
                    debug!("Reloading after {:?} change", change.table);
                    start(&mut loads);
                }
                None => {
                    debug!("Change feed ended; page is no longer live");
                    subscription = None;
                }
            },
            manual = refresh_rx.recv() => match manual {
                Some(()) => start(&mut loads),
                None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ChangeEvent;
    use meow_types::events::Table;
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    #[test]
    fn gate_admits_only_latest() {
        let gate = RequestGate::new();
        let first = gate.begin();
        let second = gate.begin();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
    }

    fn change() -> ChangeEvent {
        ChangeEvent {
            space_id: Uuid::nil(),
            table: Table::Moods,
            user_id: Uuid::nil(),
        }
    }

    #[test]
    fn publish_rejects_superseded_ticket() {
        let gate = RequestGate::new();
        let (state_tx, state) = watch::channel(PageState::Loading);
        let stale = gate.begin();
        let fresh = gate.begin();

        assert!(publish(&state_tx, &gate, fresh, PageState::Ready("fresh")));
        assert!(!publish(&state_tx, &gate, stale, PageState::Ready("stale")));
        assert_eq!(*state.borrow(), PageState::Ready("fresh"));
    }

    #[tokio::test]
    async fn loads_before_feed_attaches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (attach_tx, attach_rx) = tokio::sync::oneshot::channel::<Option<Subscription>>();

        let view = LiveView::spawn_attaching(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n) }
            },
            async move { attach_rx.await.ok().flatten() },
            Duration::from_millis(10),
        );
        // Feed still pending, page already rendered
        assert_eq!(view.settled().await, PageState::Ready(1));

        let (tx, rx) = mpsc::channel(4);
        let mut states = view.watch();
        assert!(attach_tx.send(Some(Subscription::from_receiver(rx))).is_ok());
        states.wait_for(|s| *s == PageState::Ready(2)).await.unwrap();

        tx.send(change()).await.unwrap();
        states.wait_for(|s| *s == PageState::Ready(3)).await.unwrap();
    }

    #[tokio::test]
    async fn reloads_once_per_burst() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (tx, rx) = mpsc::channel(16);

        let view = LiveView::spawn(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n) }
            },
            Some(Subscription::from_receiver(rx)),
            Duration::from_millis(30),
        );
        assert_eq!(view.settled().await, PageState::Ready(1));

        let mut rx_state = view.watch();
        rx_state.borrow_and_update();
        for _ in 0..5 {
            tx.send(change()).await.unwrap();
        }
        rx_state.changed().await.unwrap();
        assert_eq!(*rx_state.borrow(), PageState::Ready(2));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_result_never_overwrites_newer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        // First load is slow, second is fast
        let view = LiveView::spawn(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        tokio::time::sleep(Duration::from_millis(150)).await;
                        Ok("stale")
                    } else {
                        Ok("fresh")
                    }
                }
            },
            None,
            Duration::from_millis(10),
        );
        view.refresh();

        assert_eq!(view.settled().await, PageState::Ready("fresh"));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(view.state(), PageState::Ready("fresh"));
    }

    #[tokio::test]
    async fn failures_are_published() {
        let view: LiveView<u8> = LiveView::spawn(
            || async { Err(ClientError::NetworkUnavailable("down".into())) },
            None,
            Duration::from_millis(10),
        );
        match view.settled().await {
            PageState::Failed(e) => assert!(e.is_network()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn drop_releases_subscription() {
        let (tx, rx) = mpsc::channel(1);
        let view = LiveView::spawn(|| async { Ok(()) }, Some(Subscription::from_receiver(rx)), Duration::from_millis(10));
        view.settled().await;
        drop(view);

        tokio::time::timeout(Duration::from_secs(1), tx.closed()).await.unwrap();
    }
}
