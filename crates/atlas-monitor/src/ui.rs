use crate::app::{App, Mode};
use crate::session::ConnectionState;
use crate::theme::{self, icons};
use crate::view::{
    format_size, format_timestamp, page_count, paginate, short_digest, PageCursor,
    HISTORY_PAGE_SIZE,
};
use atlas_core::{CacheEntry, Transaction};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState, Tabs,
        Wrap,
    },
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    let area = f.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, layout[0]);
    render_tabs(f, app, layout[1]);
    match app.mode {
        Mode::Cache => render_cache(f, app, layout[2]),
        Mode::Chain => render_chain(f, app, layout[2]),
        Mode::Peers => render_peers(f, app, layout[2]),
        Mode::Log => render_log(f, app, layout[2]),
    }
    render_footer(f, app, layout[3]);

    if app.help_open {
        render_help(f, centered_rect(60, 70, area));
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let state = app.session.state();
    let chip = match state {
        ConnectionState::Open => icons::CONNECTED,
        ConnectionState::Connecting => icons::LOADING,
        ConnectionState::Closed => icons::DISCONNECTED,
    };
    let summary = Line::from(vec![
        Span::styled("node ", Style::default().fg(theme::MUTED)),
        Span::raw(app.session.endpoint().to_string()),
        Span::raw("  "),
        Span::styled(
            format!("[{chip} {}]", state.label()),
            theme::connection_style(state),
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "blocks {}  peers {}  cache {}  log {}",
                app.store.chain.len(),
                app.store.peers.len(),
                app.store.cache.len(),
                app.store.legacy_log.len()
            ),
            Style::default().fg(theme::ACCENT),
        ),
    ]);
    let note = Line::from(Span::styled(
        app.status_note.clone().unwrap_or_default(),
        Style::default().fg(theme::MUTED),
    ));
    let header = Paragraph::new(Text::from(vec![summary, note])).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled("atlas monitor", theme::HEADER_STYLE)),
    );
    f.render_widget(header, area);
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Mode::ALL
        .iter()
        .enumerate()
        .map(|(idx, mode)| Line::from(format!("{} {}", idx + 1, mode.title())))
        .collect();
    let selected = Mode::ALL
        .iter()
        .position(|mode| *mode == app.mode)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(theme::MUTED))
        .highlight_style(theme::HEADER_STYLE.add_modifier(Modifier::UNDERLINED))
        .divider("|");
    f.render_widget(tabs, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.mode {
        Mode::Cache => "j/k row  h/l page  enter expand  [/] history page  r refresh  ? help  q quit",
        _ => "j/k scroll  tab switch  r refresh  p peers  n next block  ? help  q quit",
    };
    f.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(theme::MUTED))),
        area,
    );
}

fn render_cache(f: &mut Frame, app: &App, area: Rect) {
    let title = format!(
        "Cache  page {}/{}",
        app.cache_page + 1,
        app.cache_page_count()
    );
    let block = Block::default().borders(Borders::ALL).title(title);
    let visible = app.visible_cache();
    if visible.is_empty() {
        let message = if app.session.is_open() {
            "No cache entries."
        } else {
            "No cache data yet."
        };
        f.render_widget(
            Paragraph::new(Span::styled(message, Color::Yellow)).block(block),
            area,
        );
        return;
    }

    let expanded = app.selection.expanded_key();
    let mut rows = Vec::new();
    let mut highlight = 0;
    for (idx, entry) in visible.iter().enumerate() {
        if idx == app.cursor {
            highlight = rows.len();
        }
        let is_expanded = expanded == Some(entry.name.as_str());
        rows.push(cache_row(entry, is_expanded).style(theme::zebra_row_style(idx)));
        if is_expanded {
            rows.extend(history_rows(app, &entry.name));
        }
    }

    let widths = [
        Constraint::Min(32),
        Constraint::Length(10),
        Constraint::Length(20),
        Constraint::Length(20),
        Constraint::Length(6),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Name", "Size", "Last updated", "Last accessed", "Txs"])
                .style(theme::HEADER_STYLE),
        )
        .block(block)
        .highlight_style(theme::SELECTED_STYLE);
    let mut state = TableState::default();
    state.select(Some(highlight));
    f.render_stateful_widget(table, area, &mut state);
}

fn cache_row(entry: &CacheEntry, expanded: bool) -> Row<'static> {
    let icon = if expanded {
        icons::EXPANDED
    } else {
        icons::COLLAPSED
    };
    Row::new(vec![
        Cell::from(Line::from(vec![
            Span::styled(format!("{icon} "), Color::Blue),
            Span::raw(entry.name.clone()),
        ])),
        Cell::from(format_size(entry.size)),
        Cell::from(format_timestamp(entry.last_updated)),
        Cell::from(format_timestamp(entry.last_accessed)),
        Cell::from(entry.transaction_count.to_string()),
    ])
}

/// Sub-rows shown beneath an expanded cache row.
fn history_rows(app: &App, key: &str) -> Vec<Row<'static>> {
    let note = |text: String| {
        Row::new(vec![Cell::from(format!("    {text}"))]).style(theme::HISTORY_ROW_STYLE)
    };
    let Some(history) = app.store.history_for(key) else {
        let text = if app.store.history_pending(key) {
            format!("{} loading history", icons::LOADING)
        } else {
            "history unavailable".to_string()
        };
        return vec![note(text)];
    };
    if history.is_empty() {
        return vec![note("no transactions".to_string())];
    }

    let page = app.selection.history_page();
    let mut rows: Vec<Row<'static>> = paginate(history, PageCursor::new(page, HISTORY_PAGE_SIZE))
        .iter()
        .map(history_row)
        .collect();
    rows.push(note(format!(
        "history page {}/{}  ({} total)",
        page + 1,
        page_count(history.len(), HISTORY_PAGE_SIZE),
        history.len()
    )));
    rows
}

fn history_row(tx: &Transaction) -> Row<'static> {
    Row::new(vec![
        Cell::from(format!("    client {}", tx.client_id)),
        Cell::from(Span::styled(
            tx.operation.to_string(),
            theme::operation_color(&tx.operation),
        )),
        Cell::from(format_timestamp(tx.timestamp)),
        Cell::from(tx.data_name.clone()),
        Cell::from(""),
    ])
    .style(theme::HISTORY_ROW_STYLE)
}

fn render_chain(f: &mut Frame, app: &App, area: Rect) {
    let rows: Vec<Row> = app
        .store
        .chain
        .iter()
        .enumerate()
        .skip(app.scroll as usize)
        .map(|(idx, block)| {
            let count = block.transaction_count.max(block.transactions.len() as u64);
            Row::new(vec![
                Cell::from(idx.to_string()),
                Cell::from(short_digest(&block.merkle_root)),
                Cell::from(short_digest(&block.previous_hash)),
                Cell::from(format_timestamp(block.timestamp)),
                Cell::from(count.to_string()),
            ])
            .style(theme::zebra_row_style(idx))
        })
        .collect();
    let widths = [
        Constraint::Length(6),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(20),
        Constraint::Min(4),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["#", "Merkle root", "Previous", "Timestamp", "Txs"])
                .style(theme::HEADER_STYLE),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Chain  {} blocks", app.store.chain.len())),
        );
    f.render_widget(table, area);
}

fn render_peers(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .store
        .peers
        .iter()
        .skip(app.scroll as usize)
        .map(|peer| ListItem::new(peer.label()))
        .collect();
    let title = format!("Peers  {}", app.store.peers.len());
    f.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

fn render_log(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .store
        .legacy_log
        .iter()
        .skip(app.scroll as usize)
        .map(|tx| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", format_timestamp(tx.timestamp)),
                    Style::default().fg(theme::MUTED),
                ),
                Span::styled(
                    format!("{:<7}", tx.operation.to_string()),
                    theme::operation_color(&tx.operation),
                ),
                Span::raw(format!("{}  client {}", tx.data_name, tx.client_id)),
            ]))
        })
        .collect();
    f.render_widget(
        List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Transaction log"),
        ),
        area,
    );
}

fn render_help(f: &mut Frame, area: Rect) {
    let bindings = [
        ("j / k", "Move row cursor (scroll on other tabs)"),
        ("h / l", "Previous / next cache page"),
        ("[ / ]", "Previous / next history page"),
        ("Enter", "Expand or collapse the selected entry"),
        ("Tab, 1-4", "Switch tab"),
        ("r", "Re-request chain and cache"),
        ("p", "Request peer list"),
        ("n", "Request the next block"),
        ("?", "Toggle help"),
        ("q / Esc", "Quit"),
    ];
    let mut lines = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(bindings.iter().map(|(keys, action)| {
        Line::from(vec![
            Span::styled(format!("{keys:<10}"), Color::Cyan),
            Span::raw(*action),
        ])
    }));

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .border_style(Style::default().fg(Color::Yellow)),
        ),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}
