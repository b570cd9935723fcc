use super::grid::{CalendarGrid, WeekdayExt};
use crate::tickets::DaySummary;
use crate::theme::{COMPLETE_STYLE, PARTIAL_STYLE, TITLE_STYLE, UNSTARTED_STYLE, WEEKDAY_STYLE};
use ratatui::{prelude::*, widgets::*};
use time::{Date, Weekday};

static HEADER: &str = concat!(
    " Sun     ",
    " Mon     ",
    " Tue     ",
    " Wed     ",
    " Thu     ",
    " Fri     ",
    " Sat     ",
);

/// Number of columns per day of week
const DAY_WIDTH: u16 = 9;

/// Width of the calendar in columns
const MAIN_WIDTH: u16 = DAY_WIDTH * 7;

/// Number of lines taken up by the title, the weekday names, and the rule
/// below them
const HEADER_LINES: u16 = 3;

/// Number of lines taken up by each week of the calendar: the day label, the
/// ticket counts, and a blank separator
const WEEK_LINES: u16 = 3;

const ACS_HLINE: char = '─';

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Calendar<'a> {
    grid: &'a CalendarGrid,
    title: &'a str,
    today: Date,
}

impl<'a> Calendar<'a> {
    pub(crate) fn new(grid: &'a CalendarGrid, title: &'a str, today: Date) -> Calendar<'a> {
        Calendar { grid, title, today }
    }
}

impl Widget for Calendar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let left = area.width.saturating_sub(MAIN_WIDTH) / 2;
        let area = Rect {
            x: area.x + left,
            width: MAIN_WIDTH.min(area.width),
            ..area
        };
        let mut canvas = BufferCanvas::new(area, buf);
        canvas.draw_title(self.title);
        canvas.draw_header();
        for (i, week) in std::iter::zip(0u16.., self.grid.weeks()) {
            for (wd, cell) in week.enumerate() {
                canvas.draw_label(i, wd, cell.label(cell.date == self.today));
                if let Some(summary) = cell.summary {
                    canvas.draw_tickets(i, wd, &summary);
                }
            }
        }
    }
}

/// Green when the day is complete, red when no ticket has been checked in,
/// orange otherwise
fn summary_style(summary: &DaySummary) -> Style {
    if summary.complete {
        COMPLETE_STYLE
    } else if summary.checked_in == 0 {
        UNSTARTED_STYLE
    } else {
        PARTIAL_STYLE
    }
}

#[derive(Debug, Eq, PartialEq)]
struct BufferCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
}

impl<'a> BufferCanvas<'a> {
    fn new(area: Rect, buf: &'a mut Buffer) -> Self {
        Self { area, buf }
    }

    fn draw_title(&mut self, title: &str) {
        let width = u16::try_from(Line::raw(title).width()).unwrap_or(u16::MAX);
        self.mvprint(
            0,
            MAIN_WIDTH.saturating_sub(width) / 2,
            title,
            Some(TITLE_STYLE),
        );
    }

    fn draw_header(&mut self) {
        self.mvprint(1, 0, HEADER, Some(WEEKDAY_STYLE));
        self.hline(2, 0, ACS_HLINE, MAIN_WIDTH);
    }

    fn draw_label(&mut self, week_no: u16, wd: Weekday, label: String) {
        self.mvprint(
            week_no * WEEK_LINES + HEADER_LINES,
            DAY_WIDTH * wd.index0(),
            label,
            None,
        );
    }

    fn draw_tickets(&mut self, week_no: u16, wd: Weekday, summary: &DaySummary) {
        self.mvprint(
            week_no * WEEK_LINES + HEADER_LINES + 1,
            DAY_WIDTH * wd.index0() + 1,
            format!("{}/{}", summary.checked_in, summary.total),
            Some(summary_style(summary)),
        );
    }

    fn mvprint<S: AsRef<str>>(&mut self, y: u16, x: u16, s: S, style: Option<Style>) {
        if y < self.area.height && x < self.area.width {
            let text = Text::styled(s.as_ref(), style.unwrap_or_default());
            let width = u16::try_from(text.width()).unwrap_or(u16::MAX);
            // Using a Paragraph lets us truncate text that extends beyond the
            // calendar's area, though we need to be sure that the Rect passed
            // to the Paragraph is entirely within the frame lest a panic
            // result.
            Paragraph::new(text).render(
                Rect {
                    x: x + self.area.x,
                    y: y + self.area.y,
                    width: (self.area.width - x).min(width),
                    height: 1,
                },
                self.buf,
            );
        }
    }

    fn hline(&mut self, y: u16, x: u16, ch: char, length: u16) {
        self.mvprint(y, x, String::from(ch).repeat(length.into()), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::BASE_STYLE;
    use crate::tickets::DaySummaries;
    use crate::window::CalendarWindow;
    use time::macros::date;

    fn pad(s: &str) -> String {
        format!("{s:<63}")
    }

    #[test]
    fn test_week_view() {
        let window = CalendarWindow::new(date!(2025 - 09 - 17));
        let summaries = DaySummaries::from([
            (
                date!(2025 - 09 - 15),
                DaySummary {
                    checked_in: 1,
                    total: 2,
                    closed: 0,
                    resolved: 0,
                    complete: false,
                },
            ),
            (
                date!(2025 - 09 - 16),
                DaySummary {
                    checked_in: 3,
                    total: 3,
                    closed: 0,
                    resolved: 0,
                    complete: true,
                },
            ),
            (
                date!(2025 - 09 - 19),
                DaySummary {
                    checked_in: 0,
                    total: 12,
                    closed: 0,
                    resolved: 0,
                    complete: false,
                },
            ),
        ]);
        let grid = CalendarGrid::new(&window, &summaries);
        let title = window.title();
        let area = Rect::new(0, 0, 63, 6);
        let mut buffer = Buffer::empty(area);
        buffer.set_style(area, BASE_STYLE);
        Calendar::new(&grid, &title, date!(2025 - 09 - 17)).render(area, &mut buffer);
        let mut expected = Buffer::with_lines([
            pad("                 Week: 2025-09-14 → 2025-09-20"),
            pad(" Sun      Mon      Tue      Wed      Thu      Fri      Sat"),
            "─".repeat(63),
            pad(" 14/9     15/9     16/9    [17/9]    18/9     19/9     20/9"),
            pad("          1/2      3/3                        0/12"),
            pad(""),
        ]);
        expected.set_style(*expected.area(), BASE_STYLE);
        expected.set_style(Rect::new(17, 0, 29, 1), TITLE_STYLE);
        expected.set_style(Rect::new(0, 1, 63, 1), WEEKDAY_STYLE);
        expected.set_style(Rect::new(10, 4, 3, 1), PARTIAL_STYLE);
        expected.set_style(Rect::new(19, 4, 3, 1), COMPLETE_STYLE);
        expected.set_style(Rect::new(46, 4, 4, 1), UNSTARTED_STYLE);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn test_month_view_leading_blanks() {
        let window = CalendarWindow::new(date!(2025 - 11 - 20)).toggle_mode();
        let grid = CalendarGrid::new(&window, &DaySummaries::new());
        let title = window.title();
        let area = Rect::new(0, 0, 63, 6);
        let mut buffer = Buffer::empty(area);
        Calendar::new(&grid, &title, date!(2025 - 09 - 17)).render(area, &mut buffer);
        // Only the first row fits; November 1st is a Saturday.
        let row: String = (0..63)
            .map(|x| buffer[(x, 3)].symbol().to_owned())
            .collect();
        assert_eq!(row, pad("                                                       1/11"));
        let title_row: String = (0..63)
            .map(|x| buffer[(x, 0)].symbol().to_owned())
            .collect();
        assert_eq!(title_row, pad("                         November 2025"));
    }

    #[test]
    fn test_narrow_area_truncates() {
        let window = CalendarWindow::new(date!(2025 - 09 - 17));
        let grid = CalendarGrid::new(&window, &DaySummaries::new());
        let title = window.title();
        let area = Rect::new(0, 0, 20, 6);
        let mut buffer = Buffer::empty(area);
        Calendar::new(&grid, &title, date!(2025 - 09 - 17)).render(area, &mut buffer);
        let row: String = (0..20)
            .map(|x| buffer[(x, 3)].symbol().to_owned())
            .collect();
        assert_eq!(row, " 14/9     15/9     1");
    }
}
