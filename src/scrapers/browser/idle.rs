//! Network-idle detection for rendered pages.
//!
//! A page counts as loaded once at most `max_inflight` requests have been
//! outstanding for a continuous `quiet_period`.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::scrapers::FetchError;

/// When a page's network activity counts as settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlePolicy {
    pub max_inflight: usize,
    pub quiet_period: Duration,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self {
            max_inflight: 2,
            quiet_period: Duration::from_millis(500),
        }
    }
}

/// Outstanding request bookkeeping.
#[derive(Debug)]
pub struct InFlight {
    policy: IdlePolicy,
    pending: HashSet<String>,
    quiet_since: Option<Instant>,
}

impl InFlight {
    pub fn new(policy: IdlePolicy, now: Instant) -> Self {
        Self {
            policy,
            pending: HashSet::new(),
            quiet_since: Some(now),
        }
    }

    pub fn started(&mut self, request_id: impl Into<String>, now: Instant) {
        self.pending.insert(request_id.into());
        self.refresh(now);
    }

    pub fn settled(&mut self, request_id: &str, now: Instant) {
        self.pending.remove(request_id);
        self.refresh(now);
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// The instant the page becomes idle if nothing else happens, or `None`
    /// while too many requests are outstanding.
    pub fn idle_at(&self) -> Option<Instant> {
        self.quiet_since.map(|t| t + self.policy.quiet_period)
    }

    fn refresh(&mut self, now: Instant) {
        if self.pending.len() <= self.policy.max_inflight {
            self.quiet_since.get_or_insert(now);
        } else {
            self.quiet_since = None;
        }
    }
}

/// One request lifecycle event, keyed by request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Started(String),
    /// Finished or failed.
    Settled(String),
}

/// Follows a page's request events until the idle policy is met.
///
/// Create it before navigating so no request is missed. Queued events are
/// always applied before the idle deadline is looked at.
pub struct IdleWatcher<S> {
    events: S,
    open: bool,
    state: InFlight,
}

impl<S> IdleWatcher<S>
where
    S: Stream<Item = NetworkEvent> + Unpin,
{
    pub fn new(events: S, policy: IdlePolicy) -> Self {
        Self {
            events,
            open: true,
            state: InFlight::new(policy, Instant::now()),
        }
    }

    /// Navigate with `navigate` and wait for the network to settle, all
    /// within `ceiling`.
    pub async fn load<F>(&mut self, url: &Url, ceiling: Duration, navigate: F) -> Result<(), FetchError>
    where
        F: Future<Output = Result<(), FetchError>>,
    {
        let loaded = tokio::time::timeout(ceiling, async {
            self.track_until(navigate).await?;
            self.wait().await;
            Ok::<(), FetchError>(())
        })
        .await;

        match loaded {
            Ok(result) => result,
            Err(_) => {
                debug!("Gave up on {} with {} request(s) in flight", url, self.state.in_flight());
                Err(FetchError::Timeout {
                    url: url.to_string(),
                    secs: ceiling.as_secs(),
                })
            }
        }
    }

    /// Drive `work` to completion while recording request events.
    pub async fn track_until<F: Future>(&mut self, work: F) -> F::Output {
        tokio::pin!(work);
        loop {
            tokio::select! {
                biased;
                event = self.events.next(), if self.open => self.apply(event),
                out = &mut work => return out,
            }
        }
    }

    /// Resolve once the network has been quiet long enough. Callers bound
    /// this with their own timeout.
    pub async fn wait(&mut self) {
        loop {
            let idle_at = self.state.idle_at();
            tokio::select! {
                biased;
                event = self.events.next(), if self.open => self.apply(event),
                _ = sleep_until(idle_at) => {
                    debug!("Network idle ({} request(s) in flight)", self.state.in_flight());
                    return;
                }
            }
        }
    }

    fn apply(&mut self, event: Option<NetworkEvent>) {
        let now = Instant::now();
        match event {
            Some(NetworkEvent::Started(id)) => self.state.started(id, now),
            Some(NetworkEvent::Settled(id)) => self.state.settled(&id, now),
            None => self.open = false,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(feature = "browser")]
pub(crate) use cdp::attach;

#[cfg(feature = "browser")]
mod cdp {
    use chromiumoxide::cdp::browser_protocol::network::{
        EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    };
    use chromiumoxide::error::CdpError;
    use chromiumoxide::Page;
    use futures::stream::{self, BoxStream, SelectAll};
    use futures::StreamExt;

    use super::{IdlePolicy, IdleWatcher, NetworkEvent};

    pub(crate) type PageEvents = SelectAll<BoxStream<'static, NetworkEvent>>;

    /// Subscribe to a page's request events.
    pub(crate) async fn attach(
        page: &Page,
        policy: IdlePolicy,
    ) -> Result<IdleWatcher<PageEvents>, CdpError> {
        let requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await?
            .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|e| NetworkEvent::Settled(e.request_id.inner().clone()));
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await?
            .map(|e| NetworkEvent::Settled(e.request_id.inner().clone()));

        let events = stream::select_all([requests.boxed(), finished.boxed(), failed.boxed()]);
        Ok(IdleWatcher::new(events, policy))
    }
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc;

    use super::*;

    fn policy() -> IdlePolicy {
        IdlePolicy::default()
    }

    fn page_url() -> Url {
        Url::parse("https://korean.visitkorea.or.kr/detail/ms_detail.do?cotid=1").unwrap()
    }

    fn start(tx: &mpsc::UnboundedSender<NetworkEvent>, ids: std::ops::Range<usize>) {
        for i in ids {
            tx.unbounded_send(NetworkEvent::Started(format!("req-{i}")))
                .unwrap();
        }
    }

    fn settle(tx: &mpsc::UnboundedSender<NetworkEvent>, ids: std::ops::Range<usize>) {
        for i in ids {
            tx.unbounded_send(NetworkEvent::Settled(format!("req-{i}")))
                .unwrap();
        }
    }

    #[test]
    fn fresh_page_is_idle_after_quiet_period() {
        let t0 = Instant::now();
        let state = InFlight::new(policy(), t0);
        assert_eq!(state.idle_at(), Some(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn two_requests_do_not_reset_the_quiet_window() {
        let t0 = Instant::now();
        let mut state = InFlight::new(policy(), t0);
        state.started("a", t0 + Duration::from_millis(100));
        state.started("b", t0 + Duration::from_millis(200));
        assert_eq!(state.in_flight(), 2);
        assert_eq!(state.idle_at(), Some(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn third_request_cancels_idle_until_one_settles() {
        let t0 = Instant::now();
        let mut state = InFlight::new(policy(), t0);
        state.started("a", t0);
        state.started("b", t0);
        state.started("c", t0 + Duration::from_millis(50));
        assert_eq!(state.idle_at(), None);

        let t1 = t0 + Duration::from_millis(300);
        state.settled("b", t1);
        assert_eq!(state.idle_at(), Some(t1 + Duration::from_millis(500)));
    }

    #[test]
    fn unknown_request_ids_are_ignored() {
        let t0 = Instant::now();
        let mut state = InFlight::new(policy(), t0);
        state.settled("never-started", t0 + Duration::from_millis(10));
        assert_eq!(state.in_flight(), 0);
        assert_eq!(state.idle_at(), Some(t0 + Duration::from_millis(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_requests_hold_off_an_expired_quiet_window() {
        let (tx, rx) = mpsc::unbounded();
        let mut watcher = IdleWatcher::new(rx, policy());

        // The quiet window has long passed by the time the events are read.
        tokio::time::advance(Duration::from_secs(2)).await;
        start(&tx, 0..10);

        let waited = tokio::time::timeout(Duration::from_secs(5), watcher.wait()).await;
        assert!(waited.is_err());
        assert_eq!(watcher.state.in_flight(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn settling_to_the_limit_resolves_after_quiet_period() {
        let (tx, rx) = mpsc::unbounded();
        let mut watcher = IdleWatcher::new(rx, policy());
        start(&tx, 0..5);

        let later = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            settle(&later, 0..3);
        });

        let began = Instant::now();
        watcher.wait().await;
        assert_eq!(began.elapsed(), Duration::from_millis(1500));
        assert_eq!(watcher.state.in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_page_times_out_at_the_ceiling() {
        let (tx, rx) = mpsc::unbounded();
        let mut watcher = IdleWatcher::new(rx, policy());

        let began = Instant::now();
        let err = watcher
            .load(&page_url(), Duration::from_secs(30), async {
                start(&tx, 0..3);
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok::<(), FetchError>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { secs: 30, .. }));
        assert_eq!(began.elapsed(), Duration::from_secs(30));
        assert_eq!(watcher.state.in_flight(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_window_counts_from_before_navigation() {
        let (_tx, rx) = mpsc::unbounded::<NetworkEvent>();
        let mut watcher = IdleWatcher::new(rx, policy());

        let began = Instant::now();
        watcher
            .load(&page_url(), Duration::from_secs(30), async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<(), FetchError>(())
            })
            .await
            .unwrap();

        assert_eq!(began.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_errors_pass_through() {
        let (_tx, rx) = mpsc::unbounded::<NetworkEvent>();
        let mut watcher = IdleWatcher::new(rx, policy());

        let err = watcher
            .load(&page_url(), Duration::from_secs(30), async {
                Err(FetchError::Navigation {
                    url: page_url().to_string(),
                    message: "net::ERR_NAME_NOT_RESOLVED".into(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Navigation { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_event_stream_still_reaches_idle() {
        let (tx, rx) = mpsc::unbounded();
        let mut watcher = IdleWatcher::new(rx, policy());
        start(&tx, 0..1);
        drop(tx);

        let began = Instant::now();
        watcher.wait().await;
        assert_eq!(began.elapsed(), Duration::from_millis(500));
    }
}
