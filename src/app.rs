use crate::events::AppEvent;
use crate::models::{DiffItem, DiffPage, Mode, NoteKey};
use crate::notes::{NoteBoard, NoteEvent};

/// A generation the UI has just started and that still needs a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub key: NoteKey,
    pub generation: u64,
    pub diff: String,
}

#[derive(Debug)]
pub struct App {
    pub should_quit: bool,
    pub show_help: bool,
    pub exit_pending: bool,

    pub diffs: Vec<DiffItem>,
    pub selected: usize,
    pub scroll_offset: usize,
    pub current_page: u32,
    pub next_page: Option<u32>,
    /// Page number of the fetch in flight
    pub fetching: Option<u32>,
    pub initial_fetch_done: bool,
    pub error: Option<String>,

    pub notes: NoteBoard,
    next_generation: u64,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            show_help: false,
            exit_pending: false,
            diffs: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            current_page: 1,
            next_page: None,
            fetching: None,
            initial_fetch_done: false,
            error: None,
            notes: NoteBoard::new(),
            next_generation: 1,
        }
    }

    pub const fn quit(&mut self) {
        self.should_quit = true;
    }

    pub const fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub const fn is_fetching(&self) -> bool {
        self.fetching.is_some()
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.diffs.len() {
            self.selected += 1;
        }
    }

    pub const fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_diff(&self) -> Option<&DiffItem> {
        self.diffs.get(self.selected)
    }

    /// Start over from the first page. Returns the page to fetch, if a fetch may start.
    pub fn begin_refresh(&mut self) -> Option<u32> {
        if self.is_fetching() {
            return None;
        }
        self.diffs.clear();
        self.selected = 0;
        self.scroll_offset = 0;
        self.begin_fetch(1)
    }

    /// Fetch the next page, when there is one
    pub fn begin_load_more(&mut self) -> Option<u32> {
        if self.is_fetching() {
            return None;
        }
        self.next_page.and_then(|page| self.begin_fetch(page))
    }

    fn begin_fetch(&mut self, page: u32) -> Option<u32> {
        self.fetching = Some(page);
        self.error = None;
        Some(page)
    }

    /// Announce a note generation for the selected diff and reset its accumulator
    pub fn begin_generation(&mut self, mode: Mode) -> Option<PendingGeneration> {
        let diff = self.selected_diff()?;
        let key = NoteKey::new(diff.id.clone(), mode);
        let diff = diff.diff.clone();

        let generation = self.next_generation;
        self.next_generation += 1;

        self.apply_note(NoteEvent::Requested {
            key: key.clone(),
            generation,
        });

        Some(PendingGeneration {
            key,
            generation,
            diff,
        })
    }

    pub fn toggle_notes(&mut self, mode: Mode) {
        if let Some(diff) = self.selected_diff() {
            let key = NoteKey::new(diff.id.clone(), mode);
            self.apply_note(NoteEvent::Toggled(key));
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Note(event) => self.apply_note(event),
            AppEvent::DiffsLoaded { page, result } => self.apply_page(page, result),
            AppEvent::DiffsFailed(error) => {
                self.fetching = None;
                self.error = Some(error);
            }
        }
    }

    fn apply_note(&mut self, event: NoteEvent) {
        self.notes = std::mem::take(&mut self.notes).apply(event);
    }

    /// First page replaces the list; later pages append only ids not already listed
    fn apply_page(&mut self, page: u32, result: DiffPage) {
        self.fetching = None;

        if page == 1 {
            self.diffs = result.diffs;
            self.selected = 0;
        } else {
            let fresh: Vec<DiffItem> = result
                .diffs
                .into_iter()
                .filter(|item| !self.diffs.iter().any(|d| d.id == item.id))
                .collect();
            self.diffs.extend(fresh);
        }

        self.current_page = result.current_page;
        self.next_page = result.next_page;
        self.initial_fetch_done = true;

        let ids = self.diffs.iter().map(|d| d.id.clone()).collect();
        self.apply_note(NoteEvent::Listed(ids));
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
