use crate::theme::{BASE_STYLE, COMPLETE_STYLE, PARTIAL_STYLE, TITLE_STYLE, UNSTARTED_STYLE};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Flex, Layout, Rect},
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Widget},
};

static KEYS: &[(&str, &str)] = &[
    ("h, LEFT", "Previous week or month"),
    ("l, RIGHT", "Next week or month"),
    ("m", "Toggle week/month view"),
    ("0, HOME", "Jump to today"),
    ("g", "Input date to jump to"),
    ("r", "Reload tickets"),
    ("?", "Show this help"),
    ("q, ESC", "Quit"),
];

static LEGEND: &[(&str, Style, &str)] = &[
    ("n/n", COMPLETE_STYLE, "Every ticket handled"),
    ("k/n", PARTIAL_STYLE, "Some tickets checked in"),
    ("0/n", UNSTARTED_STYLE, "No tickets checked in"),
];

/// Width of the key column
const KEY_WIDTH: usize = 16;

/// Overlay listing the key bindings and what the colors of the ticket counts
/// mean
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Help;

impl Help {
    fn text() -> Text<'static> {
        let mut lines = KEYS
            .iter()
            .map(|&(keys, what)| Line::raw(format!("{keys:KEY_WIDTH$}{what}")))
            .collect::<Vec<_>>();
        lines.push(Line::raw(""));
        lines.push(Line::styled("Ticket counts (checked in/total)", TITLE_STYLE));
        for &(sample, style, what) in LEGEND {
            lines.push(Line::from_iter([
                Span::styled(sample, style),
                Span::raw(" ".repeat(KEY_WIDTH - sample.len())),
                Span::raw(what),
            ]));
        }
        lines.push(Line::raw(""));
        lines.push(Line::raw("Press the Any Key to dismiss."));
        Text::from(lines)
    }
}

impl Widget for Help {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text = Help::text();
        let height = u16::try_from(text.height())
            .unwrap_or(u16::MAX)
            .min(area.height)
            .saturating_add(2);
        let width = u16::try_from(text.width())
            .unwrap_or(u16::MAX)
            .min(area.width)
            .saturating_add(2);
        let para = Paragraph::new(text)
            .block(
                Block::bordered()
                    .title(" Commands ")
                    .title_alignment(Alignment::Center),
            )
            .style(BASE_STYLE);
        let [help_area] = Layout::horizontal([width]).flex(Flex::Center).areas(area);
        let [help_area] = Layout::vertical([height])
            .flex(Flex::Center)
            .areas(help_area);
        // Leave a column of padding on either side of the border
        let outer_area = Rect {
            x: help_area.x.saturating_sub(1),
            y: help_area.y,
            width: help_area.width.saturating_add(2),
            height: help_area.height,
        };
        Clear.render(outer_area, buf);
        Block::new().style(BASE_STYLE).render(outer_area, buf);
        para.render(help_area, buf);
    }
}
