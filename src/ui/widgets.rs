use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::models::{DiffItem, Mode};
use crate::notes::{bullet_points, DiffNote, NoteState};

pub fn render_help_window(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            "Diff Digest - Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Pull requests:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  f             - Fetch latest diffs"),
        Line::from("  n             - Load more"),
        Line::from("  Up/Down       - Select pull request"),
        Line::from(""),
        Line::from(Span::styled("Notes:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  d             - Generate developer notes"),
        Line::from("  m             - Generate marketing notes"),
        Line::from("  D / M         - Show/hide developer / marketing notes"),
        Line::from(""),
        Line::from(Span::styled("General:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Ctrl+H        - Show/hide this help"),
        Line::from("  Ctrl+C        - Quit (press twice)"),
        Line::from("  Ctrl+Q        - Quit immediately"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Ctrl+H or Esc to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    // Calculate centered position
    let popup_width = 60;
    let popup_height = 21;
    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: popup_width.min(area.width),
        height: popup_height.min(area.height),
    };

    frame.render_widget(Clear, popup_area);
    frame.render_widget(help_paragraph, popup_area);
}

pub fn render_bottom_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if app.exit_pending {
        (
            "Press Ctrl+C again to exit, Esc to cancel",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        (
            "f: Fetch | n: More | d/m: Notes | D/M: Show/Hide | Ctrl+H: Help | Ctrl+C: Quit",
            Style::default().fg(Color::DarkGray),
        )
    };

    let bar = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(style);

    frame.render_widget(bar, area);
}

pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let fetching = match app.fetching {
        Some(1) => " [Fetching...]",
        Some(_) => " [Loading more...]",
        None => "",
    };

    let status_text = format!(
        "{} pull requests | page {}{fetching}",
        app.diffs.len(),
        app.current_page
    );

    let color = if app.error.is_some() {
        Color::Red
    } else if app.is_fetching() {
        Color::Yellow
    } else {
        Color::Green
    };

    let status = Paragraph::new(status_text)
        .alignment(Alignment::Right)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD));

    frame.render_widget(status, area);
}

fn diff_header(item: &DiffItem, selected: bool) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let title_style = if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Blue)
    };

    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Cyan)),
        Span::styled(format!("PR #{}:", item.id), title_style),
        Span::raw(format!(" {}", item.description)),
    ])
}

/// Lines for one mode's notes: a header, then the bullets unless hidden
pub fn note_lines(mode: Mode, state: &NoteState, shown: bool) -> Vec<Line<'static>> {
    let arrow = if shown { "v" } else { ">" };
    let mut lines = vec![Line::from(Span::styled(
        format!("    {arrow} {} Notes", mode.label()),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    if !shown {
        return lines;
    }

    match state {
        NoteState::Failed => lines.push(Line::from(Span::styled(
            format!("      {}", state.text()),
            Style::default().fg(Color::Red),
        ))),
        _ if state.is_loading() => lines.push(Line::from(Span::styled(
            "      loading...",
            Style::default().fg(Color::DarkGray),
        ))),
        _ => {
            for (index, point) in bullet_points(state.text()).into_iter().enumerate() {
                lines.push(Line::from(format!("      {}. {point}", index + 1)));
            }
        }
    }

    lines
}

fn diff_note_lines(note: &DiffNote) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for mode in [Mode::Developer, Mode::Marketing] {
        if let Some(state) = note.state(mode) {
            lines.extend(note_lines(mode, state, note.is_shown(mode)));
        }
    }
    lines
}

fn placeholder(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::DarkGray),
    ))
}

pub fn render_diff_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let mut lines = Vec::new();
    let mut selected_line = 0;

    if let Some(error) = &app.error {
        lines.push(Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
    }

    if !app.initial_fetch_done && !app.is_fetching() {
        lines.push(placeholder(
            "Press f to fetch the latest merged pull requests from the repository.",
        ));
    }

    if app.initial_fetch_done && app.diffs.is_empty() && !app.is_fetching() && app.error.is_none()
    {
        lines.push(placeholder("No merged pull requests found or fetched."));
    }

    for (index, item) in app.diffs.iter().enumerate() {
        if index == app.selected {
            selected_line = lines.len();
        }
        lines.push(diff_header(item, index == app.selected));
        if let Some(note) = app.notes.get(&item.id) {
            lines.extend(diff_note_lines(note));
        }
    }

    if matches!(app.fetching, Some(page) if page > 1) {
        lines.push(Line::from(""));
        lines.push(placeholder("Loading more..."));
    } else if let (Some(next), None) = (app.next_page, app.fetching) {
        lines.push(Line::from(""));
        lines.push(placeholder(&format!("Press n to load more (page {next})")));
    }

    // Work in visual lines so wrapped notes do not push the selection off screen
    let available_width = (area.width as usize).max(1);
    let visual_height = |line: &Line<'_>| line.width().div_ceil(available_width).max(1);
    let selected_top: usize = lines.iter().take(selected_line).map(visual_height).sum();
    let total_visual_lines: usize = lines.iter().map(visual_height).sum();

    // One row goes to the title
    let visible_height = (area.height as usize).saturating_sub(1);
    let max_scroll = total_visual_lines.saturating_sub(visible_height);

    if selected_top < app.scroll_offset {
        app.scroll_offset = selected_top;
    } else if selected_top >= app.scroll_offset + visible_height {
        app.scroll_offset = selected_top + 1 - visible_height;
    }
    app.scroll_offset = app.scroll_offset.min(max_scroll);

    let list = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::NONE)
                .title(Span::styled(
                    "Merged Pull Requests",
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                )),
        )
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(app.scroll_offset).unwrap_or(u16::MAX), 0));

    frame.render_widget(list, area);
}
