use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, Wrap,
};

use super::super::display::{ResultCard, escape_markup, truncate};
use super::super::status_line;
use super::{Focus, Prompt, PromptKind, SourceIndicator, TuiState};

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);

pub(super) fn draw_tui(frame: &mut Frame, state: &mut TuiState) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(header(state), chunks[0]);

    let cursor = if state.focus == Focus::Query { "▏" } else { "" };
    let query = Paragraph::new(format!("{}{cursor}", state.query))
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .block(focus_block("Search", state.focus == Focus::Query));
    frame.render_widget(query, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);
    draw_results(frame, state, body[0]);
    draw_episodes(frame, state, body[1]);

    let controls = Paragraph::new(controls_line(state.focus))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[3]);

    let status_widget = Paragraph::new(state.status.clone())
        .style(status_style(&state.status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[4]);

    if let Some(prompt) = state.prompt.as_ref() {
        draw_prompt(frame, prompt);
    }
}

fn header(state: &TuiState) -> Paragraph<'static> {
    let (indicator, indicator_style) = match state.source_indicator {
        SourceIndicator::Testing => ("● testing...".to_string(), Style::default().fg(Color::Yellow)),
        SourceIndicator::AwaitingUrl => (
            "● no endpoint set".to_string(),
            Style::default().fg(Color::Yellow),
        ),
        SourceIndicator::Known(status) => {
            let color = if status.available {
                Color::Rgb(120, 220, 140)
            } else {
                Color::Rgb(255, 145, 120)
            };
            (status_line(&status), Style::default().fg(color))
        }
    };
    let mut spans = vec![
        Span::styled(
            "VIDSEEK",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("source {}", escape_markup(&state.source.code)),
            Style::default().fg(MUTED),
        ),
        Span::styled("  ", Style::default()),
        Span::styled(indicator, indicator_style),
    ];
    if state.is_loading() {
        spans.push(Span::styled("   loading...", Style::default().fg(Color::Yellow)));
    }
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel_block("Dashboard"))
}

fn draw_results(frame: &mut Frame, state: &mut TuiState, area: Rect) {
    let rows: Vec<Row> = state
        .results
        .iter()
        .map(|item| {
            let card = ResultCard::from_item(item);
            Row::new(vec![
                Cell::from(truncate(&card.title, 40)),
                Cell::from(card.source_label.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(card.tags()),
                Cell::from(truncate(&card.remarks, 24)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Length(12),
            Constraint::Length(18),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["Title", "Source", "Tags", "Remarks"])
            .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    )
    .block(focus_block("Results", state.focus == Focus::Results))
    .row_highlight_style(highlight_style())
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, area, &mut state.results_table);
}

fn draw_episodes(frame: &mut Frame, state: &mut TuiState, area: Rect) {
    let focused = state.focus == Focus::Episodes;
    let Some(title) = state.title.as_ref() else {
        let hint = if state.loading_detail {
            "Loading details..."
        } else {
            "Select a result and press Enter to list its episodes."
        };
        let empty = Paragraph::new(hint)
            .style(Style::default().fg(MUTED))
            .wrap(Wrap { trim: true })
            .block(focus_block("Episodes", focused));
        frame.render_widget(empty, area);
        return;
    };

    let details = title.details();
    let heading = match details.source_label.as_deref() {
        Some(label) => format!(
            "{} ({})",
            truncate(&escape_markup(&details.title), 32),
            escape_markup(label)
        ),
        None => format!(
            "{} ({})",
            truncate(&escape_markup(&details.title), 32),
            escape_markup(&details.source.to_string())
        ),
    };

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(3)])
        .split(area);
    let caption = Paragraph::new(Line::from(vec![
        Span::styled(heading, Style::default().fg(Color::Rgb(230, 230, 230))),
        Span::styled("   r: ", Style::default().fg(MUTED)),
        Span::styled(
            title.order().toggle_caption(),
            Style::default().fg(Color::Yellow),
        ),
    ]));
    frame.render_widget(caption, parts[0]);

    if !details.has_playable_video() {
        let empty = Paragraph::new("No playable video found.")
            .style(Style::default().fg(MUTED))
            .block(focus_block("Episodes", focused));
        frame.render_widget(empty, parts[1]);
        return;
    }

    let rows: Vec<Row> = title
        .slots()
        .into_iter()
        .map(|slot| {
            Row::new(vec![
                Cell::from(format!("{:>3}", slot.display_position + 1)),
                Cell::from(slot.label()),
                Cell::from(truncate(slot.url, 48)),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [Constraint::Length(4), Constraint::Length(12), Constraint::Min(10)],
    )
    .block(focus_block("Episodes", focused))
    .row_highlight_style(highlight_style())
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, parts[1], &mut state.episodes_table);
}

fn draw_prompt(frame: &mut Frame, prompt: &Prompt) {
    let (title, question) = match prompt.kind {
        PromptKind::SourceCode => ("Change Source", "Source code (or \"custom\"):"),
        PromptKind::CustomUrl => ("Custom Endpoint", "Custom endpoint URL:"),
    };
    let text = format!("{question}\n\n{}▏\n\n[Enter] Save   [Esc] Cancel", prompt.input);
    let area = popup_rect_for_text(frame.area(), &text);
    render_popup_shadow(frame, area);
    frame.render_widget(Clear, area);
    let popup = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(modal_block(title));
    frame.render_widget(popup, area);
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn focus_block(title: &'static str, focused: bool) -> Block<'static> {
    if focused {
        panel_block(title).border_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
    } else {
        panel_block(title)
    }
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

fn highlight_style() -> Style {
    Style::default()
        .bg(ACCENT)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn controls_line(focus: Focus) -> Line<'static> {
    let keys = match focus {
        Focus::Query => "Enter search  Tab results  Esc quit",
        Focus::Results => "↑/↓ move  Enter details  / search  s source  t test  Tab next  q quit",
        Focus::Episodes => {
            "↑/↓ move  Enter play  n/p next/prev  r reverse  s source  t test  q quit"
        }
    };
    Line::from(Span::styled(keys, Style::default().fg(MUTED)))
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}

fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width.max(1));
    let clamped_height = height.min(area.height.max(1));
    let x = area.x + area.width.saturating_sub(clamped_width) / 2;
    let y = area.y + area.height.saturating_sub(clamped_height) / 2;
    Rect::new(x, y, clamped_width, clamped_height)
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        (popup_area.x + 1).min(area.x + area.width.saturating_sub(1)),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width.saturating_sub(1),
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}

fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let max_line_width = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    let line_count = text.lines().count() as u16;

    let available_width = area.width.saturating_sub(2).max(1);
    let width = max_line_width
        .saturating_add(12)
        .clamp(48.min(available_width), 72.min(available_width));

    let available_height = area.height.saturating_sub(2).max(1);
    let height = line_count
        .saturating_add(4)
        .clamp(8.min(available_height), 14.min(available_height));

    centered_fixed_rect(width, height, area)
}
