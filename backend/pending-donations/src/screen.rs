//! Long-running controller task that owns the screen's view state.
//!
//! The controller processes one [`ScreenEvent`] at a time. Remote calls run
//! as spawned tasks and report back through a completion channel, so input is
//! never blocked on the network.
//!
//! ## Cancellation
//!
//! * Each visibility period (focus gained → focus lost) owns a child
//!   [`CancellationToken`]; losing focus cancels every request started in it.
//! * Completions tagged with an older period are discarded, as are fetches
//!   superseded by a newer fetch.
//! * Dropping the [`ScreenHandle`] cancels the root token and stops the task.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::DonationApi;
use crate::donation::{DonationRecord, VolunteerRemark};
use crate::errors::{DonationsError, Result};

const EVENT_BUFFER: usize = 32;

/// Input to the screen: lifecycle notifications and user actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    /// The screen became visible. Starts a fetch.
    FocusGained,
    /// The screen was hidden. Cancels in-flight requests.
    FocusLost,
    /// Explicit re-fetch (pull-to-refresh).
    Refresh,
    /// Open the status picker on a record, replacing any previous target.
    Edit(String),
    /// Close the status picker without updating.
    CancelEdit,
    /// A status was picked for a record.
    SelectStatus { id: String, status: VolunteerRemark },
    Shutdown,
}

impl ScreenEvent {
    /// Translate a raw picker value. The empty "Select Status" placeholder
    /// and unknown values produce no event.
    pub fn from_picker(id: &str, value: &str) -> Option<Self> {
        VolunteerRemark::parse(value).map(|status| Self::SelectStatus {
            id: id.to_string(),
            status,
        })
    }
}

/// User-visible alerts raised by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    StatusUpdated {
        id: String,
        status: VolunteerRemark,
    },
    UpdateFailed {
        id: String,
        status: VolunteerRemark,
        message: String,
    },
    FetchFailed {
        message: String,
    },
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Self::StatusUpdated { .. } => "Updated",
            Self::UpdateFailed { .. } | Self::FetchFailed { .. } => "Error",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::StatusUpdated { status, .. } => format!("Status updated to {status}"),
            Self::UpdateFailed { .. } => "Failed to update status.".to_string(),
            Self::FetchFailed { .. } => "Failed to load pending donations.".to_string(),
        }
    }
}

/// Snapshot published to observers after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Last successfully fetched list, replaced wholesale on each fetch.
    pub donations: Vec<DonationRecord>,
    /// Record whose status picker is open.
    pub editing: Option<String>,
    pub loading: bool,
    /// Message of the last failed fetch; cleared by the next success.
    pub error: Option<String>,
    pub focused: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            donations: Vec::new(),
            editing: None,
            loading: true,
            error: None,
            focused: false,
        }
    }
}

impl ViewState {
    pub fn find(&self, id: &str) -> Option<&DonationRecord> {
        self.donations.iter().find(|d| d.id == id)
    }
}

// ─────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────

/// Owner-side handle. Dropping it tears the screen down.
pub struct ScreenHandle {
    events: mpsc::Sender<ScreenEvent>,
    state: watch::Receiver<ViewState>,
    notices: mpsc::UnboundedReceiver<Notice>,
    task: JoinHandle<()>,
}

impl ScreenHandle {
    pub async fn send(&self, event: ScreenEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| DonationsError::Closed)
    }

    /// Current snapshot.
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Split into the event sender, state receiver and notice receiver so a
    /// front-end can drive them from separate tasks. The controller stops
    /// once every sender clone is dropped.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Sender<ScreenEvent>,
        watch::Receiver<ViewState>,
        mpsc::UnboundedReceiver<Notice>,
    ) {
        (self.events, self.state, self.notices)
    }

    /// Stop the controller and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.events.send(ScreenEvent::Shutdown).await;
        if let Err(e) = self.task.await {
            error!("Screen task ended abnormally: {e}");
        }
    }
}

/// Start a screen controller on the current tokio runtime.
pub fn spawn<A: DonationApi>(api: Arc<A>) -> ScreenHandle {
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (state_tx, state_rx) = watch::channel(ViewState::default());
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();

    let screen = PendingScreen::new(api, state_tx, notice_tx);
    let task = tokio::spawn(screen.run(events_rx));

    ScreenHandle {
        events: events_tx,
        state: state_rx,
        notices: notice_rx,
        task,
    }
}

// ─────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────

enum Completion {
    Fetched {
        period: u64,
        seq: u64,
        result: Result<Vec<DonationRecord>>,
    },
    Updated {
        period: u64,
        id: String,
        status: VolunteerRemark,
        result: Result<()>,
    },
}

struct Visibility {
    period: u64,
    token: CancellationToken,
}

struct PendingScreen<A> {
    api: Arc<A>,
    state: ViewState,
    state_tx: watch::Sender<ViewState>,
    notices: mpsc::UnboundedSender<Notice>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    root: CancellationToken,
    visibility: Option<Visibility>,
    period: u64,
    fetch_seq: u64,
    /// Set once any fetch has completed; until then the screen stays loading.
    loaded: bool,
}

impl<A: DonationApi> PendingScreen<A> {
    fn new(
        api: Arc<A>,
        state_tx: watch::Sender<ViewState>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            api,
            state: ViewState::default(),
            state_tx,
            notices,
            completions_tx,
            completions_rx,
            root: CancellationToken::new(),
            visibility: None,
            period: 0,
            fetch_seq: 0,
            loaded: false,
        }
    }

    async fn run(mut self, mut events: mpsc::Receiver<ScreenEvent>) {
        info!("Pending donations screen started");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(ScreenEvent::Shutdown) | None => break,
                    Some(event) => self.handle_event(event),
                },
                Some(done) = self.completions_rx.recv() => self.handle_completion(done),
            }
        }

        self.root.cancel();
        info!("Pending donations screen stopped");
    }

    fn handle_event(&mut self, event: ScreenEvent) {
        debug!("Screen event: {event:?}");
        match event {
            ScreenEvent::FocusGained => {
                if self.visibility.is_none() {
                    self.period += 1;
                    self.visibility = Some(Visibility {
                        period: self.period,
                        token: self.root.child_token(),
                    });
                    self.state.focused = true;
                }
                self.start_fetch();
            }
            ScreenEvent::FocusLost => {
                if let Some(vis) = self.visibility.take() {
                    vis.token.cancel();
                    debug!("Cancelled requests of visibility period {}", vis.period);
                }
                self.state.focused = false;
                if self.loaded {
                    self.state.loading = false;
                }
                self.publish();
            }
            ScreenEvent::Refresh => self.start_fetch(),
            ScreenEvent::Edit(id) => {
                if self.state.find(&id).is_none() {
                    warn!("Ignoring edit for unknown donation {id}");
                    return;
                }
                self.state.editing = Some(id);
                self.publish();
            }
            ScreenEvent::CancelEdit => {
                if self.state.editing.take().is_some() {
                    self.publish();
                }
            }
            ScreenEvent::SelectStatus { id, status } => self.start_update(id, status),
            ScreenEvent::Shutdown => {}
        }
    }

    fn start_fetch(&mut self) {
        let Some(vis) = &self.visibility else {
            debug!("Screen not visible; fetch skipped");
            return;
        };
        let period = vis.period;
        let token = vis.token.child_token();

        self.fetch_seq += 1;
        let seq = self.fetch_seq;
        self.state.loading = true;
        self.publish();

        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => debug!("Fetch #{seq} cancelled"),
                result = api.fetch_pending_donations() => {
                    let _ = tx.send(Completion::Fetched { period, seq, result });
                }
            }
        });
    }

    fn start_update(&mut self, id: String, status: VolunteerRemark) {
        let Some(vis) = &self.visibility else {
            debug!("Screen not visible; update of {id} skipped");
            return;
        };
        let period = vis.period;
        let token = vis.token.child_token();

        info!("Updating volunteer remark of {id} to {status}");
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => debug!("Update of {id} cancelled"),
                result = api.update_volunteer_remark(&id, status) => {
                    let _ = tx.send(Completion::Updated { period, id, status, result });
                }
            }
        });
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Fetched {
                period,
                seq,
                result,
            } => {
                if !self.is_current(period) || seq != self.fetch_seq {
                    debug!("Discarding stale fetch #{seq}");
                    return;
                }
                self.state.loading = false;
                self.loaded = true;
                match result {
                    Ok(donations) => {
                        info!("Loaded {} pending donations", donations.len());
                        self.state.donations = donations;
                        self.state.error = None;
                        let still_listed = self
                            .state
                            .editing
                            .as_deref()
                            .is_some_and(|id| self.state.find(id).is_some());
                        if !still_listed {
                            self.state.editing = None;
                        }
                        self.publish();
                    }
                    Err(e) => {
                        error!("Error fetching pending donations: {e}");
                        let message = e.to_string();
                        self.state.error = Some(message.clone());
                        self.publish();
                        self.notify(Notice::FetchFailed { message });
                    }
                }
            }
            Completion::Updated {
                period,
                id,
                status,
                result,
            } => {
                if !self.is_current(period) {
                    debug!("Discarding update result for {id} from period {period}");
                    return;
                }
                match result {
                    Ok(()) => {
                        info!("Volunteer remark of {id} updated to {status}");
                        self.state.editing = None;
                        self.publish();
                        self.notify(Notice::StatusUpdated { id, status });
                        self.start_fetch();
                    }
                    Err(e) => {
                        warn!("Failed to update volunteer remark of {id}: {e}");
                        self.notify(Notice::UpdateFailed {
                            id,
                            status,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    fn is_current(&self, period: u64) -> bool {
        self.visibility.as_ref().is_some_and(|v| v.period == period)
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
