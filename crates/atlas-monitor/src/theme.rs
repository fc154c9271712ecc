use crate::session::ConnectionState;
use atlas_core::Operation;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const HISTORY_ROW_STYLE: Style = Style::new().fg(Color::Rgb(189, 174, 147));
pub const MUTED: Color = Color::Rgb(146, 131, 116);
pub const ACCENT: Color = Color::Cyan;

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub fn connection_style(state: ConnectionState) -> Style {
    let color = match state {
        ConnectionState::Connecting => Color::Rgb(250, 189, 47),
        ConnectionState::Open => Color::Rgb(184, 187, 38),
        ConnectionState::Closed => Color::Rgb(254, 128, 25),
    };
    Style::new().fg(color).add_modifier(Modifier::BOLD)
}

pub fn operation_color(operation: &Operation) -> Color {
    match operation {
        Operation::Set => Color::Rgb(131, 165, 152),
        Operation::Get => Color::Rgb(142, 192, 124),
        Operation::Delete => Color::Rgb(214, 93, 14),
        Operation::Other(_) => MUTED,
    }
}

pub mod icons {
    pub const EXPANDED: &str = "v";
    pub const COLLAPSED: &str = ">";
    pub const LOADING: &str = "~";
    pub const CONNECTED: &str = "*";
    pub const DISCONNECTED: &str = "x";
}
