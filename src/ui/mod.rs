pub mod widgets;

use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Pull requests and their notes
            Constraint::Length(1), // Empty gap
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Bottom keymap bar
        ])
        .split(frame.area());

    widgets::render_diff_list(frame, app, chunks[0]);
    // chunks[1] is the gap, left empty
    widgets::render_status_bar(frame, app, chunks[2]);
    widgets::render_bottom_bar(frame, app, chunks[3]);

    if app.show_help {
        widgets::render_help_window(frame, frame.area());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AppEvent;
    use crate::models::{DiffItem, DiffPage, Mode};
    use crate::notes::NoteEvent;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(ratatui::buffer::Cell::symbol).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_render_before_first_fetch() {
        let mut app = App::new();
        let screen = screen(&mut app);
        assert!(screen.contains("Press f to fetch"));
        assert!(screen.contains("0 pull requests"));
    }

    #[test]
    fn test_render_streamed_notes() {
        let mut app = App::new();
        app.handle_event(AppEvent::DiffsLoaded {
            page: 1,
            result: DiffPage {
                diffs: vec![DiffItem {
                    id: "42".into(),
                    description: "Dark mode".into(),
                    diff: "+dark".into(),
                    url: "https://example.com/pull/42".into(),
                }],
                next_page: Some(2),
                current_page: 1,
                per_page: 10,
            },
        });
        let pending = app.begin_generation(Mode::Marketing).unwrap();
        assert!(screen(&mut app).contains("loading..."));

        app.handle_event(AppEvent::Note(NoteEvent::Fragment {
            key: pending.key,
            generation: pending.generation,
            text: "Added /// dark mode".into(),
        }));

        let screen = screen(&mut app);
        assert!(screen.contains("PR #42: Dark mode"));
        assert!(screen.contains("Marketing Notes"));
        assert!(screen.contains("1. dark mode"));
        assert!(screen.contains("Press n to load more (page 2)"));
    }
}
