// src/store.rs
//! In-memory application store.
//!
//! Holds the flattened issue and podcast collections plus the podcast cursor. The
//! collections are loaded lazily, at most once per store, and replaced wholesale.
//! Concurrent loads of the same collection queue behind the in-flight one and share its
//! outcome, success or failure, instead of fetching again.

use crate::content::{Issue, IssueNumber, Podcast};
use crate::content_download::ContentGateway;
use crate::content_factory::EntryFactory;
use crate::errors::StoreError;
use log::{debug, info};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreState {
    pub issues: Vec<Issue>,
    pub podcasts: Vec<Podcast>,
    #[serde(rename = "currentPodcastNumber")]
    pub current_podcast_number: IssueNumber,
}

/// Serialises the loads of one collection. Callers that queued while a load was running
/// get that load's outcome instead of starting another one.
#[derive(Default)]
struct LoadGate {
    completed: AtomicU64,
    last_failure: Mutex<Option<String>>,
}

pub struct Store {
    gateway: Arc<dyn ContentGateway>,
    factory: EntryFactory,
    state: RwLock<StoreState>,
    issues_gate: LoadGate,
    podcasts_gate: LoadGate,
}

impl Store {
    pub fn new(gateway: Arc<dyn ContentGateway>, factory: EntryFactory) -> Self {
        Self {
            gateway,
            factory,
            state: RwLock::new(StoreState::default()),
            issues_gate: LoadGate::default(),
            podcasts_gate: LoadGate::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    // ===================================== Mutations =========================================

    pub fn set_issues(&self, issues: Vec<Issue>) {
        self.write().issues = issues;
    }

    pub fn set_podcasts(&self, podcasts: Vec<Podcast>) {
        self.write().podcasts = podcasts;
    }

    pub fn set_current_podcast(&self, issue_number: IssueNumber) {
        self.write().current_podcast_number = issue_number;
    }

    // ====================================== Actions ==========================================

    async fn load_once<F, Fut>(
        &self,
        gate: &LoadGate,
        collection: &'static str,
        loaded: fn(&StoreState) -> bool,
        load: F,
    ) -> Result<bool, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        if loaded(&self.read()) {
            return Ok(false);
        }

        let seen = gate.completed.load(Ordering::SeqCst);
        let mut last_failure = gate.last_failure.lock().await;
        if gate.completed.load(Ordering::SeqCst) != seen {
            debug!("Store: {} loaded by a concurrent request", collection);
            return match last_failure.as_ref() {
                Some(reason) => Err(StoreError::SharedLoadFailed { collection, reason: reason.clone() }),
                None => Ok(false),
            };
        }
        if loaded(&self.read()) {
            return Ok(false);
        }

        let outcome = load().await;
        *last_failure = outcome.as_ref().err().map(|e| e.to_string());
        gate.completed.fetch_add(1, Ordering::SeqCst);
        outcome.map(|()| true)
    }

    async fn load_issues(&self) -> Result<(), StoreError> {
        let raw = self.gateway.fetch_issues().await?;
        let issues = self.factory.create_issues(&raw)?;
        info!("Store: committing {} issues", issues.len());
        self.set_issues(issues);
        Ok(())
    }

    async fn load_podcasts(&self) -> Result<(), StoreError> {
        let raw = self.gateway.fetch_podcasts().await?;
        let podcasts = self.factory.create_podcasts(&raw)?;
        let latest: Option<IssueNumber> = podcasts.last().map(Podcast::issue_number);
        info!("Store: committing {} podcasts", podcasts.len());
        self.set_podcasts(podcasts);
        if let Some(latest) = latest {
            self.set_current_podcast(latest);
        }
        Ok(())
    }

    /// Loads issues unless already loaded. Returns `Ok(false)` when nothing was fetched.
    pub async fn get_issues(&self) -> Result<bool, StoreError> {
        self.load_once(&self.issues_gate, "issues", |s: &StoreState| !s.issues.is_empty(), || {
            self.load_issues()
        })
        .await
    }

    /// Loads podcasts unless already loaded, then points the cursor at the last one.
    pub async fn get_podcasts(&self) -> Result<bool, StoreError> {
        self.load_once(&self.podcasts_gate, "podcasts", |s: &StoreState| !s.podcasts.is_empty(), || {
            self.load_podcasts()
        })
        .await
    }

    /// Advances the cursor to `cursor + 1`, wrapping to the first podcast when there is no
    /// such issue (end of list or a numbering gap).
    pub fn play_next_podcast(&self) -> Result<IssueNumber, StoreError> {
        let mut state = self.write();
        let first = state
            .podcasts
            .first()
            .ok_or(StoreError::EmptyCollectionAccess("podcasts"))?
            .issue_number();
        let wanted = state.current_podcast_number.next();
        let next = state
            .podcasts
            .iter()
            .map(Podcast::issue_number)
            .find(|n| Some(*n) == wanted)
            .unwrap_or(first);
        state.current_podcast_number = next;
        debug!("Store: next podcast is #{}", next);
        Ok(next)
    }

    /// Mirror of [`Store::play_next_podcast`]: `cursor - 1`, wrapping to the last podcast.
    pub fn play_previous_podcast(&self) -> Result<IssueNumber, StoreError> {
        let mut state = self.write();
        let last = state
            .podcasts
            .last()
            .ok_or(StoreError::EmptyCollectionAccess("podcasts"))?
            .issue_number();
        let wanted = state.current_podcast_number.previous();
        let previous = state
            .podcasts
            .iter()
            .map(Podcast::issue_number)
            .find(|n| Some(*n) == wanted)
            .unwrap_or(last);
        state.current_podcast_number = previous;
        debug!("Store: previous podcast is #{}", previous);
        Ok(previous)
    }

    // ====================================== Getters ==========================================

    pub fn current_podcast(&self) -> Option<Podcast> {
        let state = self.read();
        state
            .podcasts
            .iter()
            .find(|p| p.issue_number() == state.current_podcast_number)
            .cloned()
    }

    pub fn current_podcast_number(&self) -> IssueNumber {
        self.read().current_podcast_number
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.read().issues.clone()
    }

    pub fn podcasts(&self) -> Vec<Podcast> {
        self.read().podcasts.clone()
    }

    pub fn issue(&self, issue_number: IssueNumber) -> Option<Issue> {
        self.read().issues.iter().find(|i| i.issue_number() == issue_number).cloned()
    }

    pub fn snapshot(&self) -> StoreState {
        self.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RawEntry;
    use crate::content_download::FakeGateway;
    use crate::content_factory::MalformedEntryPolicy;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn numbered(numbers: &[u32]) -> Vec<RawEntry> {
        numbers
            .iter()
            .map(|n| {
                let Value::Object(fields) = json!({ "issueNumber": n, "name": format!("#{}", n) }) else {
                    unreachable!()
                };
                RawEntry::new(&format!("entry-{}", n), fields)
            })
            .collect()
    }

    fn podcasts(numbers: &[u32]) -> Vec<Podcast> {
        numbers.iter().map(|n| Podcast::new(IssueNumber::new(*n), None, None, None, None)).collect()
    }

    fn store_over(gateway: Arc<FakeGateway>) -> Store {
        let _ = env_logger::builder().is_test(true).try_init();
        Store::new(gateway, EntryFactory::new())
    }

    #[tokio::test]
    async fn test_get_issues_fetches_once() {
        let gateway = Arc::new(FakeGateway::new(numbered(&[1, 2]), vec![]));
        let store = store_over(gateway.clone());

        assert!(store.get_issues().await.unwrap());
        assert!(!store.get_issues().await.unwrap());

        assert_eq!(gateway.issue_calls(), 1);
        assert_eq!(store.issues().len(), 2);
        assert_eq!(store.issue(IssueNumber::new(2)).unwrap().name(), "#2");
        assert!(store.issue(IssueNumber::new(3)).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let gateway = Arc::new(
            FakeGateway::new(numbered(&[1]), numbered(&[1, 2])).with_delay(Duration::from_millis(50)),
        );
        let store = store_over(gateway.clone());

        let (a, b, c) = tokio::join!(store.get_issues(), store.get_issues(), store.get_podcasts());

        let fetched = [a.unwrap(), b.unwrap()];
        assert_eq!(fetched.iter().filter(|f| **f).count(), 1);
        assert!(c.unwrap());
        assert_eq!(gateway.issue_calls(), 1);
        assert_eq!(gateway.podcast_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_podcasts_points_cursor_at_latest() {
        let gateway = Arc::new(FakeGateway::new(vec![], numbered(&[7, 5, 6])));
        let store = store_over(gateway);

        assert_eq!(store.current_podcast_number(), IssueNumber::UNSET);
        assert!(store.current_podcast().is_none());

        store.get_podcasts().await.unwrap();

        let last = store.podcasts().last().map(Podcast::issue_number);
        assert_eq!(last, Some(IssueNumber::new(7)));
        assert_eq!(store.current_podcast_number(), IssueNumber::new(7));
        assert_eq!(store.current_podcast().unwrap().name(), Some("#7"));
    }

    #[tokio::test]
    async fn test_empty_upstream_podcasts_leave_cursor_unset() {
        let store = store_over(Arc::new(FakeGateway::new(vec![], vec![])));

        assert!(store.get_podcasts().await.unwrap());
        assert_eq!(store.current_podcast_number(), IssueNumber::UNSET);
        assert!(matches!(store.play_next_podcast(), Err(StoreError::EmptyCollectionAccess(_))));
    }

    #[test]
    fn test_play_next_podcast_steps_and_wraps() {
        let store = store_over(Arc::new(FakeGateway::default()));
        store.set_podcasts(podcasts(&[5, 6, 7]));

        store.set_current_podcast(IssueNumber::new(6));
        assert_eq!(store.play_next_podcast().unwrap(), IssueNumber::new(7));
        assert_eq!(store.current_podcast_number(), IssueNumber::new(7));

        assert_eq!(store.play_next_podcast().unwrap(), IssueNumber::new(5));
        assert_eq!(store.current_podcast_number(), IssueNumber::new(5));
    }

    #[test]
    fn test_play_next_podcast_wraps_on_gap() {
        let store = store_over(Arc::new(FakeGateway::default()));
        store.set_podcasts(podcasts(&[1, 2, 4]));
        store.set_current_podcast(IssueNumber::new(2));

        assert_eq!(store.play_next_podcast().unwrap(), IssueNumber::new(1));
    }

    #[test]
    fn test_play_previous_podcast_steps_and_wraps() {
        let store = store_over(Arc::new(FakeGateway::default()));
        store.set_podcasts(podcasts(&[5, 6, 7]));
        store.set_current_podcast(IssueNumber::new(6));

        assert_eq!(store.play_previous_podcast().unwrap(), IssueNumber::new(5));
        assert_eq!(store.play_previous_podcast().unwrap(), IssueNumber::new(7));
    }

    #[test]
    fn test_current_podcast_follows_cursor() {
        let store = store_over(Arc::new(FakeGateway::default()));
        store.set_podcasts(podcasts(&[5, 6, 7]));

        assert!(store.current_podcast().is_none());
        store.set_current_podcast(IssueNumber::new(6));
        assert_eq!(store.current_podcast().map(|p| p.issue_number()), Some(IssueNumber::new(6)));
        store.set_current_podcast(IssueNumber::new(9));
        assert!(store.current_podcast().is_none());
    }

    #[test]
    fn test_play_next_podcast_from_many_threads_keeps_every_move() {
        let store = store_over(Arc::new(FakeGateway::default()));
        store.set_podcasts(podcasts(&(1..=5000).collect::<Vec<u32>>()));
        store.set_current_podcast(IssueNumber::new(1));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        store.play_next_podcast().unwrap();
                    }
                });
            }
        });

        assert_eq!(store.current_podcast_number(), IssueNumber::new(2001));
    }

    #[tokio::test]
    async fn test_concurrent_loads_of_empty_upstream_share_one_fetch() {
        let gateway = Arc::new(FakeGateway::new(vec![], vec![]).with_delay(Duration::from_millis(30)));
        let store = store_over(gateway.clone());

        let (a, b, c) = tokio::join!(store.get_podcasts(), store.get_podcasts(), store.get_podcasts());

        assert_eq!([a.unwrap(), b.unwrap(), c.unwrap()], [true, false, false]);
        assert_eq!(gateway.podcast_calls(), 1);
    }

    // SAD PATHS

    #[test]
    fn test_navigation_before_load_is_guarded() {
        let store = store_over(Arc::new(FakeGateway::default()));
        assert!(matches!(store.play_next_podcast(), Err(StoreError::EmptyCollectionAccess("podcasts"))));
        assert!(matches!(store.play_previous_podcast(), Err(StoreError::EmptyCollectionAccess(_))));
        assert_eq!(store.current_podcast_number(), IssueNumber::UNSET);
    }

    #[tokio::test]
    async fn test_failed_fetch_commits_nothing_and_can_be_repeated() {
        let gateway = Arc::new(FakeGateway::new(numbered(&[1]), vec![]));
        let store = store_over(gateway.clone());

        gateway.set_failure(Some("upstream down"));
        assert!(matches!(store.get_issues().await, Err(StoreError::Gateway(_))));
        assert!(store.issues().is_empty());

        gateway.set_failure(None);
        assert!(store.get_issues().await.unwrap());
        assert_eq!(gateway.issue_calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_failure() {
        let gateway = Arc::new(FakeGateway::new(numbered(&[1]), vec![]).with_delay(Duration::from_millis(30)));
        gateway.set_failure(Some("upstream down"));
        let store = store_over(gateway.clone());

        let (a, b, c) = tokio::join!(store.get_issues(), store.get_issues(), store.get_issues());

        assert!(matches!(a, Err(StoreError::Gateway(_))));
        assert!(matches!(b, Err(StoreError::SharedLoadFailed { collection: "issues", .. })));
        assert!(matches!(c, Err(StoreError::SharedLoadFailed { .. })));
        assert_eq!(gateway.issue_calls(), 1);
        assert!(store.issues().is_empty());

        gateway.set_failure(None);
        assert!(store.get_issues().await.unwrap());
        assert_eq!(gateway.issue_calls(), 2);
    }

    #[tokio::test]
    async fn test_abort_policy_surfaces_malformed_entry() {
        let mut raw = numbered(&[1]);
        raw.push(RawEntry::new("broken", serde_json::Map::new()));
        let store = Store::new(
            Arc::new(FakeGateway::new(raw, vec![])),
            EntryFactory::new().with_malformed_policy(MalformedEntryPolicy::Abort),
        );

        assert!(matches!(store.get_issues().await, Err(StoreError::Entry(_))));
        assert!(store.snapshot().issues.is_empty());
    }
}
