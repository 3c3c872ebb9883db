use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::Result;
use askdb_core::{
    Config, DatabaseStatus, HttpQueryClient, Notice, Notifier, Revision, SchemaInfo, Snapshot,
    StoreView, SubmissionController, SubmissionState,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use crate::tui::AppEvent;

/// How long a toast stays on screen
pub const TOAST_TTL: Duration = Duration::from_secs(5);

/// Oldest toasts are dropped beyond this many
const MAX_TOASTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    pub shown_at: Instant,
}

/// Posts controller notices back into the event loop
pub struct TuiNotifier {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl Notifier for TuiNotifier {
    fn notify(&self, notice: Notice) {
        let _ = self.tx.send(AppEvent::Notice(notice));
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input buffer
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat state
    pub history: Snapshot,
    pub submission: SubmissionState,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_lines: u16,  // Wrapped line count from the last render
    pub follow_chat: bool,
    pub max_records: Option<usize>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Toasts, oldest first
    pub toasts: Vec<Toast>,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    // Service
    pub controller: Arc<SubmissionController<HttpQueryClient>>,
    pub view: StoreView,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: mpsc::UnboundedSender<AppEvent>) -> Result<Self> {
        let client = match config.request_timeout() {
            Some(timeout) => HttpQueryClient::with_timeout(&config.endpoint, timeout)?,
            None => HttpQueryClient::new(&config.endpoint),
        };
        let notifier = Arc::new(TuiNotifier { tx: events.clone() });
        let controller = Arc::new(SubmissionController::new(client, notifier));
        let view = controller.view();

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            cursor: 0,

            history: view.snapshot(),
            submission: view.state(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_lines: 0,
            follow_chat: true,
            max_records: config.max_records,

            animation_frame: 0,

            toasts: Vec::new(),

            chat_area: None,

            controller,
            view,
            events,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.controller.client().base_url()
    }

    pub fn is_submitting(&self) -> bool {
        self.submission == SubmissionState::Submitting
    }

    /// Submit the input buffer. The controller rejects blank input and
    /// submissions while another question is in flight; the buffer is only
    /// cleared when the question is accepted.
    pub fn submit_input(&mut self) {
        let Ok(pending) = self.controller.begin(&self.input) else {
            return;
        };

        self.input.clear();
        self.cursor = 0;
        self.follow_chat = true;
        self.refresh_history();

        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            controller.complete(pending).await;
        });
    }

    /// Called for every store revision
    pub fn on_store_changed(&mut self, revision: Revision) {
        self.submission = revision.state;
        self.refresh_history();
        self.follow_chat = true;
    }

    fn refresh_history(&mut self) {
        self.history = self.view.snapshot();
        self.submission = self.view.state();
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.toasts.push(Toast {
            notice,
            shown_at: Instant::now(),
        });
        if self.toasts.len() > MAX_TOASTS {
            let excess = self.toasts.len() - MAX_TOASTS;
            self.toasts.drain(..excess);
        }
    }

    pub fn expire_toasts(&mut self, now: Instant) {
        self.toasts
            .retain(|toast| now.duration_since(toast.shown_at) < TOAST_TTL);
    }

    /// Tick animation frame and expire toasts (called by Tick event)
    pub fn tick(&mut self) {
        if self.is_submitting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.expire_toasts(Instant::now());
    }

    // Service lookups, reported as toasts
    pub fn fetch_schema_info(&self) {
        let client = self.controller.client().clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let notice = match client.schema_info().await {
                Ok(info) => Notice::info(describe_schema(&info)),
                Err(err) => Notice::warning(format!("Schema info unavailable: {err}")),
            };
            let _ = tx.send(AppEvent::Notice(notice));
        });
    }

    pub fn fetch_database_status(&self) {
        let client = self.controller.client().clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let notice = match client.database_status().await {
                Ok(status) => describe_status(&status),
                Err(err) => Notice::warning(format!("Database status unavailable: {err}")),
            };
            let _ = tx.send(AppEvent::Notice(notice));
        });
    }

    // Chat scrolling
    fn max_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = (self.chat_scroll.saturating_add(lines)).min(self.max_scroll());
        self.follow_chat = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_chat = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_chat = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_chat = true;
    }
}

fn describe_schema(info: &SchemaInfo) -> String {
    let tables: Vec<&str> = info.tables.iter().flatten().map(String::as_str).collect();
    format!(
        "{} tables ({} keyword mappings): {}",
        info.total_tables,
        info.keyword_mappings_count,
        if tables.is_empty() { "none".to_string() } else { tables.join(", ") }
    )
}

fn describe_status(status: &DatabaseStatus) -> Notice {
    if status.connected {
        Notice::success(format!("Database connected. {}", status.message))
    } else {
        Notice::warning(format!("Database not connected. {}", status.message))
    }
}
