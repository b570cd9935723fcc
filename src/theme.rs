use ratatui::style::{Color, Modifier, Style};

pub(crate) const BASE_STYLE: Style = Style::new().fg(Color::White).bg(Color::Black);

pub(crate) const TITLE_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const WEEKDAY_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const COMPLETE_STYLE: Style = Style::new().fg(Color::White).bg(Color::Green);

pub(crate) const UNSTARTED_STYLE: Style = Style::new().fg(Color::White).bg(Color::Red);

// Orange
pub(crate) const PARTIAL_STYLE: Style = Style::new()
    .fg(Color::White)
    .bg(Color::Rgb(0xFF, 0x98, 0x00));

pub(crate) const STATUS_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

pub(crate) const ERROR_STYLE: Style = BASE_STYLE
    .fg(Color::LightRed)
    .add_modifier(Modifier::BOLD);

pub(crate) mod jumpto {
    use super::*;

    pub(crate) const UNFILLED_CELL_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

    pub(crate) const READY_ENTER_STYLE: Style = BASE_STYLE.add_modifier(Modifier::UNDERLINED);
}
