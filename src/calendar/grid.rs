use crate::tickets::{DaySummaries, DaySummary};
use crate::window::CalendarWindow;
use std::iter::repeat;
use time::{Date, Weekday, Weekday::*};

const DAYS_IN_WEEK: usize = 7;

pub(super) trait WeekdayExt {
    fn index0(&self) -> u16;
}

impl WeekdayExt for Weekday {
    fn index0(&self) -> u16 {
        self.number_days_from_sunday().into()
    }
}

/// One day of the calendar along with its tickets, if any
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct DayCell {
    pub(crate) date: Date,
    pub(crate) summary: Option<DaySummary>,
}

impl DayCell {
    pub(super) fn label(&self, is_today: bool) -> String {
        let label = format!("{}/{}", self.date.day(), u8::from(self.date.month()));
        if is_today {
            format!("[{label}]")
        } else {
            format!(" {label} ")
        }
    }
}

/// One row of the grid, indexed by day of the week
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
// Invariant: At least one element of the array is Some once the week is part
// of a grid
pub(crate) struct Week([Option<DayCell>; DAYS_IN_WEEK]);

impl Week {
    pub(super) fn enumerate(&self) -> EnumerateWeek<'_> {
        EnumerateWeek::new(self)
    }

    pub(super) fn get(&self, wd: Weekday) -> Option<DayCell> {
        self.0.get(usize::from(wd.index0())).copied().flatten()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct EnumerateWeek<'a> {
    week: &'a Week,
    next_weekday: Option<Weekday>,
}

impl<'a> EnumerateWeek<'a> {
    fn new(week: &'a Week) -> Self {
        EnumerateWeek {
            week,
            next_weekday: Some(Sunday),
        }
    }
}

impl Iterator for EnumerateWeek<'_> {
    type Item = (Weekday, DayCell);

    fn next(&mut self) -> Option<(Weekday, DayCell)> {
        loop {
            let wd = self.next_weekday?;
            self.next_weekday = match wd.next() {
                Sunday => None,
                wd2 => Some(wd2),
            };
            if let Some(cell) = self.week.get(wd) {
                return Some((wd, cell));
            }
        }
    }
}

/// The days of a window laid out in rows running Sunday through Saturday.
///
/// In month view, the first row starts with as many empty cells as there are
/// days between the preceding Sunday and the first of the month, and the last
/// row is padded with empty cells after the end of the month.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CalendarGrid {
    weeks: Vec<Week>,
}

impl CalendarGrid {
    pub(crate) fn new(window: &CalendarWindow, summaries: &DaySummaries) -> CalendarGrid {
        let days = window.visible_range().days().map(|date| {
            Some(DayCell {
                date,
                summary: summaries.get(&date).copied(),
            })
        });
        let mut cells = repeat(None).take(window.leading_blanks()).chain(days).peekable();
        let mut weeks = Vec::new();
        while cells.peek().is_some() {
            let mut week = Week::default();
            for (slot, cell) in std::iter::zip(&mut week.0, cells.by_ref()) {
                *slot = cell;
            }
            weeks.push(week);
        }
        CalendarGrid { weeks }
    }

    pub(crate) fn weeks(&self) -> &[Week] {
        &self.weeks
    }

    /// Every cell of the grid in row-major order, with `None` for the empty
    /// cells before and after the days of the window
    #[cfg(test)]
    pub(crate) fn cells(&self) -> impl Iterator<Item = Option<DayCell>> + '_ {
        self.weeks.iter().flat_map(|w| w.0)
    }
}
