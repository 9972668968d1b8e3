use crate::core::PickerCore;
use crate::model::POS_UNKNOWN;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    selected_bg: Color,
}

fn palette() -> Palette {
    Palette {
        bg: Color::Rgb(10, 15, 24),
        panel_bg: Color::Rgb(19, 29, 43),
        border: Color::Rgb(69, 121, 176),
        text: Color::Rgb(214, 228, 248),
        muted: Color::Rgb(149, 173, 204),
        accent: Color::Rgb(100, 203, 184),
        selected_bg: Color::Rgb(34, 55, 82),
    }
}

fn layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area)
}

pub fn draw(frame: &mut Frame, core: &PickerCore, cursor: usize) {
    let palette = palette();
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg)),
        area,
    );

    let chunks = layout(area);

    let title = Paragraph::new(core.config.title.clone())
        .style(Style::default().fg(palette.text).bg(palette.panel_bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border)),
        );
    frame.render_widget(title, chunks[0]);

    let items: Vec<ListItem> = core
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let checked = core.clicked_pos != POS_UNKNOWN && core.clicked_pos == idx as isize;
            let mark = if checked { "(x)" } else { "( )" };
            let style = if row.is_static() {
                Style::default().fg(palette.accent)
            } else {
                Style::default().fg(palette.text)
            };
            ListItem::new(format!(" {mark} {}", row.label())).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border)),
        )
        .highlight_style(
            Style::default()
                .bg(palette.selected_bg)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    state.select((!core.rows.is_empty()).then_some(cursor.min(core.rows.len().saturating_sub(1))));
    frame.render_stateful_widget(list, chunks[1], &mut state);

    let status = Paragraph::new(core.status.clone()).style(Style::default().fg(palette.muted));
    frame.render_widget(status, chunks[2]);

    let hints = if core.config.show_ok_cancel {
        " up/down select   space preview   enter ok   esc cancel   r reload"
    } else {
        " up/down select   space preview   enter done   esc cancel   r reload"
    };
    let help = Paragraph::new(hints).style(Style::default().fg(palette.muted));
    frame.render_widget(help, chunks[3]);
}
