//! One forensic search job from launch to review.
//!
//! The session owns the result store for its job, consumes the feed in a
//! background task, gates render work behind the page-impact pre-check and
//! publishes views over a broadcast channel. Event throughput is decoupled
//! from render throughput: an insert is O(log n), and a full resort only
//! happens when the live page actually changes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::SessionError;
use crate::estimator::time_remaining_report;
use crate::models::Page;
use crate::store::{self, ResultStore};

use super::events::{FeedEvent, ProgressEvent, RawDetection, ViewEvent};
use super::state::{SearchQuery, SessionSnapshot, SessionState, SessionStatus};
use super::traits::{PageRequest, PagedQuery, ResultFeed, TaskRegistry};

const VIEW_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Retention bound of the per-job result store.
    pub capacity: usize,
    /// Results per pagination page.
    pub page_size: u32,
    /// Deadline for the external paginated query.
    pub query_timeout: Duration,
    /// How often the task registry is polled for pagination metadata.
    pub registry_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: store::DEFAULT_CAPACITY,
            page_size: 12,
            query_timeout: Duration::from_secs(10),
            registry_poll_interval: Duration::from_secs(4),
        }
    }
}

/// Orchestrates one forensic job: `Idle → Searching → Completed`, with
/// `Searching → Idle` on cancel. Owns exactly one [`ResultStore`]; stores
/// are never shared across jobs.
#[derive(Clone)]
pub struct SearchSession {
    state: Arc<Mutex<SessionState>>,
    store: Arc<Mutex<ResultStore>>,
    feed: Arc<dyn ResultFeed>,
    query: Arc<dyn PagedQuery>,
    registry: Arc<dyn TaskRegistry>,
    views: broadcast::Sender<ViewEvent>,
    feed_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    poll_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel_token: Arc<Mutex<Option<CancellationToken>>>,
    config: SessionConfig,
}

impl SearchSession {
    pub fn new(
        feed: Arc<dyn ResultFeed>,
        query: Arc<dyn PagedQuery>,
        registry: Arc<dyn TaskRegistry>,
        config: SessionConfig,
    ) -> Self {
        let (views, _) = broadcast::channel(VIEW_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            store: Arc::new(Mutex::new(ResultStore::new(config.capacity))),
            feed,
            query,
            registry,
            views,
            feed_task: Arc::new(Mutex::new(None)),
            poll_task: Arc::new(Mutex::new(None)),
            cancel_token: Arc::new(Mutex::new(None)),
            config,
        }
    }

    /// New receiver for the published views. Publishing is fire-and-forget;
    /// a lagging consumer misses updates rather than blocking the feed.
    pub fn subscribe_views(&self) -> broadcast::Receiver<ViewEvent> {
        self.views.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&*self.state.lock().await)
    }

    pub async fn retained_results(&self) -> usize {
        self.store.lock().await.len()
    }

    /// Launches a new search job and subscribes to its event feed.
    pub async fn start_search(&self, query: SearchQuery) -> Result<SessionSnapshot> {
        {
            let state = self.state.lock().await;
            if state.status == SessionStatus::Searching {
                return Err(SessionError::InvalidState {
                    status: state.status,
                }
                .into());
            }
        }

        let job_id = Uuid::new_v4().to_string();
        let receiver = self
            .feed
            .subscribe(&job_id, &query)
            .await
            .context("failed to subscribe to result feed")?;

        let snapshot = {
            let mut state = self.state.lock().await;
            if state.status == SessionStatus::Searching {
                return Err(SessionError::InvalidState {
                    status: state.status,
                }
                .into());
            }
            let sort = state.sort;
            state.begin_job(job_id.clone(), sort);
            self.store.lock().await.clear();
            SessionSnapshot::from(&*state)
        };

        let cancel_token = CancellationToken::new();
        self.spawn_feed_loop(receiver, cancel_token.clone()).await;
        self.spawn_registry_poll(job_id.clone(), cancel_token.clone())
            .await;
        *self.cancel_token.lock().await = Some(cancel_token);

        info!(
            "search started: job {} over {} sources",
            job_id,
            query.source_ids.len()
        );
        self.publish(ViewEvent::StateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    /// Stops consuming the feed and returns to `Idle`. Safe to call any
    /// number of times; retained results are kept for operator review.
    pub async fn cancel(&self) -> Result<()> {
        if let Some(token) = self.cancel_token.lock().await.take() {
            token.cancel();
        }

        if let Some(handle) = self.feed_task.lock().await.take() {
            handle.await.context("feed loop task failed to join")?;
        }
        if let Some(handle) = self.poll_task.lock().await.take() {
            handle.await.context("registry poll task failed to join")?;
        }

        let snapshot = {
            let mut state = self.state.lock().await;
            if state.status == SessionStatus::Idle {
                return Ok(());
            }
            state.status = SessionStatus::Idle;
            state.is_live = false;
            SessionSnapshot::from(&*state)
        };
        info!("search cancelled: job {:?}", snapshot.job_id);
        self.publish(ViewEvent::StateChanged(snapshot));
        Ok(())
    }

    /// Navigates to page `n`.
    ///
    /// Page 1 of a running job is served live from the store. Any other
    /// page is a static snapshot fetched from the external paginated query
    /// under a deadline; on timeout the session state is left untouched and
    /// the operator may retry.
    pub async fn change_page(&self, page_number: u32) -> Result<Page> {
        let (job_id, status, sort) = {
            let state = self.state.lock().await;
            let job_id = state.job_id.clone().ok_or(SessionError::InvalidState {
                status: state.status,
            })?;
            (job_id, state.status, state.sort)
        };

        if page_number == 1 && status == SessionStatus::Searching {
            let mut state = self.state.lock().await;
            let store = self.store.lock().await;
            state.current_page = 1;
            state.is_live = true;
            let page = store::get_page(&store, 1, self.config.page_size, state.sort);
            self.publish(ViewEvent::PageUpdated {
                page: page.clone(),
                total: state.total,
                total_pages: state.total_pages,
            });
            self.publish(ViewEvent::StateChanged(SessionSnapshot::from(&*state)));
            return Ok(page);
        }

        // Leaving the live page: the store keeps accumulating in the
        // background, but rendering switches to server-side snapshots.
        {
            let mut state = self.state.lock().await;
            state.is_live = false;
        }

        let request = PageRequest {
            job_id: job_id.clone(),
            page: page_number,
            page_size: self.config.page_size,
            sort_by: sort.by,
            descending: sort.direction == crate::models::SortDirection::Desc,
        };
        let response = match time::timeout(self.config.query_timeout, self.query.fetch_page(request))
            .await
        {
            Ok(result) => result.context("paginated query failed")?,
            Err(_) => {
                warn!(
                    "paginated query timed out: job {} page {}",
                    job_id, page_number
                );
                return Err(SessionError::QueryTimeout {
                    job_id,
                    page: page_number,
                    timeout_ms: self.config.query_timeout.as_millis() as u64,
                }
                .into());
            }
        };

        let page = Page {
            page_number: response.page,
            page_size: response.page_size,
            items: response.results,
        };
        let snapshot = {
            let mut state = self.state.lock().await;
            state.current_page = page_number;
            state.total = response.total;
            state.total_pages = response.total_pages;
            SessionSnapshot::from(&*state)
        };
        self.publish(ViewEvent::PageUpdated {
            page: page.clone(),
            total: response.total,
            total_pages: response.total_pages,
        });
        self.publish(ViewEvent::StateChanged(snapshot));
        Ok(page)
    }

    /// Changes the display order and re-renders the live page when on it.
    pub async fn set_sort(&self, sort: crate::models::SortSpec) {
        let mut state = self.state.lock().await;
        state.sort = sort;
        if state.is_live {
            let store = self.store.lock().await;
            let page = store::get_page(&store, 1, self.config.page_size, sort);
            self.publish(ViewEvent::PageUpdated {
                page,
                total: state.total,
                total_pages: state.total_pages,
            });
        }
    }

    async fn spawn_feed_loop(
        &self,
        mut receiver: mpsc::Receiver<FeedEvent>,
        cancel_token: CancellationToken,
    ) {
        let session = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_event = receiver.recv() => {
                        match maybe_event {
                            Some(event) => session.handle_feed_event(event).await,
                            None => {
                                debug!("feed channel closed");
                                break;
                            }
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        debug!("feed loop shutting down");
                        break;
                    }
                }
            }
        });

        let mut guard = self.feed_task.lock().await;
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
    }

    async fn spawn_registry_poll(&self, job_id: String, cancel_token: CancellationToken) {
        let session = self.clone();
        let interval = self.config.registry_poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => session.refresh_registry_metadata(&job_id).await,
                    _ = cancel_token.cancelled() => break,
                }
            }
        });

        let mut guard = self.poll_task.lock().await;
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
    }

    async fn handle_feed_event(&self, event: FeedEvent) {
        match event {
            FeedEvent::Detection(raw) => self.on_detection(raw).await,
            FeedEvent::Progress(progress) => self.on_progress(progress).await,
            FeedEvent::Completed => self.on_completed().await,
            FeedEvent::Stalled => self.on_stalled().await,
        }
    }

    /// Absorbs one detection. The pre-check and the insert form a single
    /// critical section under the store mutex so a concurrent insert can
    /// never interleave between them.
    async fn on_detection(&self, raw: RawDetection) {
        let mut state = self.state.lock().await;
        match state.status {
            SessionStatus::Idle => return,
            // Trailing events after completion are still retained, but no
            // further renders are scheduled.
            SessionStatus::Completed | SessionStatus::Searching => {}
        }
        state.feed_stalled = false;

        let Some(candidate) = raw.validate() else {
            state.malformed_events += 1;
            warn!(
                "dropped malformed detection event ({} so far)",
                state.malformed_events
            );
            return;
        };

        let mut store = self.store.lock().await;
        let live = state.is_live && state.status == SessionStatus::Searching;
        // Date sort admits every insert to the live view, matching the
        // shipped behavior; score sort gates on the page-1 impact check.
        let affects_live_page = live
            && match state.sort.by {
                crate::models::SortBy::Date => true,
                crate::models::SortBy::Score => store::would_affect_page(
                    &store,
                    &candidate,
                    1,
                    self.config.page_size,
                    state.sort,
                ),
            };

        let outcome = store.insert(candidate);
        if !outcome.was_added() {
            debug!("detection absorbed without retention: {outcome:?}");
            return;
        }

        if store.len() > state.total {
            state.total = store.len();
            state.total_pages = store::total_pages(state.total, self.config.page_size);
        }

        if live && affects_live_page {
            let page = store::get_page(&store, 1, self.config.page_size, state.sort);
            self.publish(ViewEvent::PageUpdated {
                page,
                total: state.total,
                total_pages: state.total_pages,
            });
        }
    }

    async fn on_progress(&self, progress: ProgressEvent) {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Searching {
            return;
        }
        state.feed_stalled = false;
        state.sources.insert(
            progress.source_id.clone(),
            crate::models::SourceProgress {
                source_id: progress.source_id,
                progress_percent: progress.progress_percent,
                sample_time: progress.sample_time,
                start_time: progress.start_time,
            },
        );

        let report = time_remaining_report(&state.sources_snapshot(), Utc::now());
        self.publish(ViewEvent::EtaUpdated(report));
    }

    async fn on_completed(&self) {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Searching {
            return;
        }
        let store = self.store.lock().await;
        state.status = SessionStatus::Completed;
        state.is_live = false;
        if store.len() > state.total {
            state.total = store.len();
            state.total_pages = store::total_pages(state.total, self.config.page_size);
        }

        let job_id = state.job_id.clone().unwrap_or_default();
        info!(
            "search completed: job {} with {} retained results",
            job_id, state.total
        );

        // One final render of the page the operator is on.
        if state.current_page == 1 {
            let page = store::get_page(&store, 1, self.config.page_size, state.sort);
            self.publish(ViewEvent::PageUpdated {
                page,
                total: state.total,
                total_pages: state.total_pages,
            });
        }
        self.publish(ViewEvent::StateChanged(SessionSnapshot::from(&*state)));
        self.publish(ViewEvent::SearchCompleted {
            job_id,
            total: state.total,
        });
    }

    async fn on_stalled(&self) {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.status != SessionStatus::Searching {
                return;
            }
            state.feed_stalled = true;
            SessionSnapshot::from(&*state)
        };
        let job_id = snapshot.job_id.clone().unwrap_or_default();
        warn!("event feed stalled for job {job_id}; transport is retrying");
        self.publish(ViewEvent::FeedStalled { job_id });
        self.publish(ViewEvent::StateChanged(snapshot));
    }

    async fn refresh_registry_metadata(&self, job_id: &str) {
        let tasks = match self.registry.tasks().await {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!("task registry poll failed: {err:#}");
                return;
            }
        };
        let Some(metadata) = tasks.get(job_id) else {
            return;
        };

        let mut state = self.state.lock().await;
        if state.job_id.as_deref() != Some(job_id) {
            return;
        }
        if metadata.count > state.total || metadata.total_pages > state.total_pages {
            state.total = state.total.max(metadata.count);
            state.total_pages = state.total_pages.max(metadata.total_pages);
            self.publish(ViewEvent::StateChanged(SessionSnapshot::from(&*state)));
        }
    }

    fn publish(&self, event: ViewEvent) {
        // No receivers is fine; views are best-effort.
        let _ = self.views.send(event);
    }
}
