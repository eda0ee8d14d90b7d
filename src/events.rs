// Event types for async communication

use crate::models::DiffPage;
use crate::notes::NoteEvent;

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A note accumulator changed
    Note(NoteEvent),
    /// A page of diffs arrived for the requested page number
    DiffsLoaded { page: u32, result: DiffPage },
    /// Fetching a page of diffs failed
    DiffsFailed(String),
}
