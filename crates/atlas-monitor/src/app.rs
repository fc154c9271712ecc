use crate::router::{route_frame, RouteOutcome};
use crate::session::{SessionEvent, SocketSession};
use crate::state::StateStore;
use crate::view::{
    page_count, paginate, shift_page, PageCursor, RowSelection, CACHE_PAGE_SIZE,
};
use atlas_core::{CacheEntry, Query};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Cache,
    Chain,
    Peers,
    Log,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Cache, Mode::Chain, Mode::Peers, Mode::Log];

    pub fn title(self) -> &'static str {
        match self {
            Mode::Cache => "Cache",
            Mode::Chain => "Chain",
            Mode::Peers => "Peers",
            Mode::Log => "Log",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Mode::Cache => Mode::Chain,
            Mode::Chain => Mode::Peers,
            Mode::Peers => Mode::Log,
            Mode::Log => Mode::Cache,
        }
    }
}

pub struct App {
    pub session: SocketSession,
    pub store: StateStore,
    pub selection: RowSelection,
    pub mode: Mode,
    pub cache_page: usize,
    /// Row cursor within the visible cache page.
    pub cursor: usize,
    pub scroll: u16,
    pub help_open: bool,
    pub status_note: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(session: SocketSession) -> Self {
        let status_note = Some(format!("connecting to {}", session.endpoint()));
        Self {
            session,
            store: StateStore::default(),
            selection: RowSelection::default(),
            mode: Mode::Cache,
            cache_page: 0,
            cursor: 0,
            scroll: 0,
            help_open: false,
            status_note,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub async fn shutdown(&mut self) {
        self.session.shutdown().await;
    }

    pub fn on_session_event(&mut self, event: SessionEvent) {
        self.session.observe(&event);
        match event {
            SessionEvent::Opened => {
                self.status_note = Some(format!(
                    "connected to {}; requested chain and cache",
                    self.session.endpoint()
                ));
            }
            SessionEvent::Frame(frame) => match route_frame(&mut self.store, &frame) {
                RouteOutcome::Applied { tag } => match tag.as_str() {
                    "cache" => self.clamp_cache_view(),
                    "history" => self.shift_history_page(0),
                    _ => {}
                },
                RouteOutcome::Ignored { .. } => {}
                RouteOutcome::Rejected(err) => {
                    self.status_note = Some(format!("dropped frame: {err}"));
                }
            },
            SessionEvent::Closed { reason } => {
                self.status_note = Some(format!("connection closed ({reason}); restart to reconnect"));
            }
        }
    }

    pub fn cache_cursor(&self) -> PageCursor {
        PageCursor::new(self.cache_page, CACHE_PAGE_SIZE)
    }

    pub fn visible_cache(&self) -> &[CacheEntry] {
        paginate(&self.store.cache, self.cache_cursor())
    }

    pub fn cache_page_count(&self) -> usize {
        page_count(self.store.cache.len(), CACHE_PAGE_SIZE)
    }

    pub fn selected_entry(&self) -> Option<&CacheEntry> {
        self.visible_cache().get(self.cursor)
    }

    /// Expands or collapses the row for `key`, requesting its history when
    /// it opens.
    pub fn toggle_row(&mut self, key: &str) {
        let request = self.selection.toggle(key);
        self.store.select(self.selection.expanded_key());
        let Some(query) = request else {
            return;
        };
        if self.session.send(query) {
            self.store.expect_history(key);
        } else {
            self.status_note = Some(format!("not connected; history for '{key}' unavailable"));
        }
    }

    pub fn toggle_selected_row(&mut self) {
        let Some(key) = self.selected_entry().map(|entry| entry.name.clone()) else {
            return;
        };
        self.toggle_row(&key);
    }

    pub fn refresh_snapshots(&mut self) {
        let chain = self.session.send(Query::chain());
        let cache = self.session.send(Query::cache());
        self.note_request("chain + cache snapshot", chain && cache);
    }

    pub fn request_peers(&mut self) {
        let sent = self.session.send(Query::peers());
        self.note_request("peer list", sent);
    }

    /// Asks for the block right after the last one held; it arrives as a
    /// `block` push and is appended.
    pub fn request_next_block(&mut self) {
        let index = self.store.chain.len() as u64;
        let sent = self.session.send(Query::block(index));
        self.note_request(&format!("block #{index}"), sent);
    }

    fn note_request(&mut self, what: &str, sent: bool) {
        self.status_note = Some(if sent {
            format!("requested {what}")
        } else {
            format!("not connected; {what} not requested")
        });
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let rows = self.visible_cache().len();
        if rows == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(rows - 1);
    }

    pub fn shift_cache_page(&mut self, delta: isize) {
        let next = shift_page(self.cache_page, delta, self.store.cache.len(), CACHE_PAGE_SIZE);
        if next != self.cache_page {
            self.cache_page = next;
            self.cursor = 0;
        }
    }

    /// A zero `delta` just clamps the page to the history currently held.
    pub fn shift_history_page(&mut self, delta: isize) {
        let Some(key) = self.selection.expanded_key() else {
            return;
        };
        let len = self.store.history_for(key).map_or(0, |history| history.len());
        self.selection.shift_history_page(delta, len);
    }

    fn clamp_cache_view(&mut self) {
        let last = self.cache_page_count() - 1;
        if self.cache_page > last {
            self.cache_page = last;
        }
        let rows = self.visible_cache().len();
        if self.cursor >= rows {
            self.cursor = rows.saturating_sub(1);
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.scroll = 0;
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return;
        }
        if self.help_open {
            if key.code == KeyCode::Esc {
                self.help_open = false;
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.set_mode(self.mode.next()),
            KeyCode::Char('1') => self.set_mode(Mode::Cache),
            KeyCode::Char('2') => self.set_mode(Mode::Chain),
            KeyCode::Char('3') => self.set_mode(Mode::Peers),
            KeyCode::Char('4') => self.set_mode(Mode::Log),
            KeyCode::Char('r') => self.refresh_snapshots(),
            KeyCode::Char('p') => self.request_peers(),
            KeyCode::Char('n') => self.request_next_block(),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.mode == Mode::Cache {
                    self.move_cursor(1);
                } else {
                    self.scroll = self.scroll.saturating_add(1);
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.mode == Mode::Cache {
                    self.move_cursor(-1);
                } else {
                    self.scroll = self.scroll.saturating_sub(1);
                }
            }
            KeyCode::Char('g') => {
                self.cursor = 0;
                self.scroll = 0;
            }
            KeyCode::Enter | KeyCode::Char(' ') if self.mode == Mode::Cache => {
                self.toggle_selected_row();
            }
            KeyCode::Right | KeyCode::Char('l') if self.mode == Mode::Cache => {
                self.shift_cache_page(1);
            }
            KeyCode::Left | KeyCode::Char('h') if self.mode == Mode::Cache => {
                self.shift_cache_page(-1);
            }
            KeyCode::Char(']') if self.mode == Mode::Cache => self.shift_history_page(1),
            KeyCode::Char('[') if self.mode == Mode::Cache => self.shift_history_page(-1),
            _ => {}
        }
    }
}
