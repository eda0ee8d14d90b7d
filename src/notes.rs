// Per-diff note state

use std::collections::HashMap;

use crate::models::{Mode, NoteKey};
use crate::prompts::BULLET_DELIMITER;

/// Shown in place of the notes when a generation fails
pub const NOTE_ERROR_TEXT: &str = "error while loading notes, please try again";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteState {
    /// Requested and still receiving fragments. Empty text means nothing has arrived yet.
    Streaming { generation: u64, text: String },
    Complete(String),
    Failed,
}

impl NoteState {
    /// Text for display: the accumulator, or the error string
    pub fn text(&self) -> &str {
        match self {
            Self::Streaming { text, .. } | Self::Complete(text) => text,
            Self::Failed => NOTE_ERROR_TEXT,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Streaming { text, .. } if text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffNote {
    pub marketing: Option<NoteState>,
    pub developer: Option<NoteState>,
    pub show_marketing: bool,
    pub show_developer: bool,
}

impl Default for DiffNote {
    fn default() -> Self {
        Self {
            marketing: None,
            developer: None,
            show_marketing: true,
            show_developer: true,
        }
    }
}

impl DiffNote {
    pub const fn state(&self, mode: Mode) -> Option<&NoteState> {
        match mode {
            Mode::Marketing => self.marketing.as_ref(),
            Mode::Developer => self.developer.as_ref(),
        }
    }

    pub const fn is_shown(&self, mode: Mode) -> bool {
        match mode {
            Mode::Marketing => self.show_marketing,
            Mode::Developer => self.show_developer,
        }
    }

    fn slot(&mut self, mode: Mode) -> &mut Option<NoteState> {
        match mode {
            Mode::Marketing => &mut self.marketing,
            Mode::Developer => &mut self.developer,
        }
    }

    fn toggle(&mut self, mode: Mode) {
        match mode {
            Mode::Marketing => self.show_marketing = !self.show_marketing,
            Mode::Developer => self.show_developer = !self.show_developer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEvent {
    /// Diffs became visible; each gets an empty entry if it has none
    Listed(Vec<String>),
    Requested { key: NoteKey, generation: u64 },
    Fragment { key: NoteKey, generation: u64, text: String },
    Finished { key: NoteKey, generation: u64 },
    Failed { key: NoteKey, generation: u64, reason: String },
    Toggled(NoteKey),
}

/// All note accumulators. Every change goes through [`NoteBoard::apply`].
///
/// Each accumulator is stamped with the generation that owns it, so a late update from an
/// earlier request never lands in a newer buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteBoard {
    notes: HashMap<String, DiffNote>,
}

impl NoteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, diff_id: &str) -> Option<&DiffNote> {
        self.notes.get(diff_id)
    }

    pub fn state(&self, key: &NoteKey) -> Option<&NoteState> {
        self.get(&key.diff_id).and_then(|note| note.state(key.mode))
    }

    #[must_use]
    pub fn apply(mut self, event: NoteEvent) -> Self {
        match event {
            NoteEvent::Listed(ids) => {
                for id in ids {
                    self.notes.entry(id).or_default();
                }
            }
            NoteEvent::Requested { key, generation } => {
                *self.entry(&key).slot(key.mode) = Some(NoteState::Streaming {
                    generation,
                    text: String::new(),
                });
            }
            NoteEvent::Fragment {
                key,
                generation,
                text,
            } => {
                if let Some(NoteState::Streaming {
                    generation: owner,
                    text: buffer,
                }) = self.slot_mut(&key)
                {
                    if *owner == generation {
                        buffer.push_str(&text);
                    }
                }
            }
            NoteEvent::Finished { key, generation } => {
                if let Some(slot) = self.owned_slot(&key, generation) {
                    if let Some(NoteState::Streaming { text, .. }) = slot.take() {
                        *slot = Some(NoteState::Complete(text));
                    }
                }
            }
            NoteEvent::Failed {
                key,
                generation,
                reason,
            } => {
                if let Some(slot) = self.owned_slot(&key, generation) {
                    tracing::warn!(
                        diff_id = %key.diff_id,
                        mode = key.mode.label(),
                        %reason,
                        "Note generation failed"
                    );
                    *slot = Some(NoteState::Failed);
                }
            }
            NoteEvent::Toggled(key) => self.entry(&key).toggle(key.mode),
        }
        self
    }

    fn entry(&mut self, key: &NoteKey) -> &mut DiffNote {
        self.notes.entry(key.diff_id.clone()).or_default()
    }

    fn slot_mut(&mut self, key: &NoteKey) -> Option<&mut NoteState> {
        self.notes
            .get_mut(&key.diff_id)
            .and_then(|note| note.slot(key.mode).as_mut())
    }

    /// The slot for `key`, only while it is streaming under `generation`
    fn owned_slot(&mut self, key: &NoteKey, generation: u64) -> Option<&mut Option<NoteState>> {
        let slot = self.notes.get_mut(&key.diff_id)?.slot(key.mode);
        let owned = matches!(
            *slot,
            Some(NoteState::Streaming { generation: owner, .. }) if owner == generation
        );
        owned.then_some(slot)
    }
}

/// Split note text into bullets.
///
/// Anything before the first delimiter is preamble and is dropped, as are empty bullets.
pub fn bullet_points(text: &str) -> Vec<&str> {
    text.split(BULLET_DELIMITER)
        .skip(1)
        .map(str::trim)
        .filter(|point| !point.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(mode: Mode) -> NoteKey {
        NoteKey::new("42", mode)
    }

    fn fragment(mode: Mode, generation: u64, text: &str) -> NoteEvent {
        NoteEvent::Fragment {
            key: key(mode),
            generation,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_listed_creates_empty_entries() {
        let board = NoteBoard::new().apply(NoteEvent::Listed(vec!["1".into(), "2".into()]));
        let note = board.get("1").unwrap();
        assert!(note.marketing.is_none());
        assert!(note.developer.is_none());
        assert!(note.show_marketing && note.show_developer);
        assert!(board.get("2").is_some());
        assert!(board.get("3").is_none());
    }

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut board = NoteBoard::new().apply(NoteEvent::Requested {
            key: key(Mode::Marketing),
            generation: 1,
        });
        assert!(board.state(&key(Mode::Marketing)).unwrap().is_loading());

        for text in ["Added ", "/// ", "dark mode"] {
            board = board.apply(fragment(Mode::Marketing, 1, text));
        }
        board = board.apply(NoteEvent::Finished {
            key: key(Mode::Marketing),
            generation: 1,
        });

        assert_eq!(
            board.state(&key(Mode::Marketing)),
            Some(&NoteState::Complete("Added /// dark mode".into()))
        );
    }

    #[test]
    fn test_failure_replaces_partial_text() {
        let board = NoteBoard::new()
            .apply(NoteEvent::Requested {
                key: key(Mode::Developer),
                generation: 3,
            })
            .apply(fragment(Mode::Developer, 3, "partial"))
            .apply(NoteEvent::Failed {
                key: key(Mode::Developer),
                generation: 3,
                reason: "quota".into(),
            })
            .apply(fragment(Mode::Developer, 3, "late"));

        let state = board.state(&key(Mode::Developer)).unwrap();
        assert_eq!(state, &NoteState::Failed);
        assert_eq!(state.text(), NOTE_ERROR_TEXT);
    }

    #[test]
    fn test_nothing_applies_after_completion() {
        let board = NoteBoard::new()
            .apply(NoteEvent::Requested {
                key: key(Mode::Developer),
                generation: 1,
            })
            .apply(fragment(Mode::Developer, 1, "done"))
            .apply(NoteEvent::Finished {
                key: key(Mode::Developer),
                generation: 1,
            })
            .apply(fragment(Mode::Developer, 1, " again"))
            .apply(NoteEvent::Failed {
                key: key(Mode::Developer),
                generation: 1,
                reason: "late".into(),
            });

        assert_eq!(
            board.state(&key(Mode::Developer)),
            Some(&NoteState::Complete("done".into()))
        );
    }

    #[test]
    fn test_regeneration_resets_and_ignores_stale_generation() {
        let board = NoteBoard::new()
            .apply(NoteEvent::Requested {
                key: key(Mode::Marketing),
                generation: 1,
            })
            .apply(fragment(Mode::Marketing, 1, "old"))
            .apply(NoteEvent::Requested {
                key: key(Mode::Marketing),
                generation: 2,
            })
            .apply(fragment(Mode::Marketing, 1, " stale"))
            .apply(NoteEvent::Finished {
                key: key(Mode::Marketing),
                generation: 1,
            })
            .apply(fragment(Mode::Marketing, 2, "new"));

        assert_eq!(
            board.state(&key(Mode::Marketing)),
            Some(&NoteState::Streaming {
                generation: 2,
                text: "new".into()
            })
        );
    }

    #[test]
    fn test_modes_do_not_share_buffers() {
        let mut board = NoteBoard::new()
            .apply(NoteEvent::Requested {
                key: key(Mode::Marketing),
                generation: 1,
            })
            .apply(NoteEvent::Requested {
                key: key(Mode::Developer),
                generation: 2,
            });

        for (mode, generation, text) in [
            (Mode::Marketing, 1, "M1"),
            (Mode::Developer, 2, "D1"),
            (Mode::Developer, 2, "D2"),
            (Mode::Marketing, 1, "M2"),
        ] {
            board = board.apply(fragment(mode, generation, text));
        }

        assert_eq!(board.state(&key(Mode::Marketing)).unwrap().text(), "M1M2");
        assert_eq!(board.state(&key(Mode::Developer)).unwrap().text(), "D1D2");
    }

    #[test]
    fn test_fragment_without_request_is_ignored() {
        let board = NoteBoard::new().apply(fragment(Mode::Marketing, 1, "orphan"));
        assert!(board.state(&key(Mode::Marketing)).is_none());
    }

    #[test]
    fn test_toggle_visibility() {
        let board = NoteBoard::new().apply(NoteEvent::Toggled(key(Mode::Developer)));
        let note = board.get("42").unwrap();
        assert!(!note.is_shown(Mode::Developer));
        assert!(note.is_shown(Mode::Marketing));
    }

    #[test]
    fn test_bullet_points_drop_preamble() {
        assert_eq!(bullet_points("Added /// dark mode"), vec!["dark mode"]);
        assert_eq!(
            bullet_points("///Faster search///Fewer crashes\n"),
            vec!["Faster search", "Fewer crashes"]
        );
        assert!(bullet_points("no delimiter at all").is_empty());
        assert_eq!(bullet_points("/// a ///   /// b"), vec!["a", "b"]);
    }
}
