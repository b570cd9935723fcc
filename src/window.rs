use std::iter::successors;
use thiserror::Error;
use time::{Date, Duration, Month};

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum Mode {
    #[default]
    Week,
    Month,
}

impl Mode {
    pub(crate) fn toggled(self) -> Mode {
        match self {
            Mode::Week => Mode::Month,
            Mode::Month => Mode::Week,
        }
    }
}

/// The week or month currently on screen.
///
/// A window is a plain value: navigating produces a new window and leaves the
/// old one untouched, so a caller can hold on to the previous window until the
/// tickets for the new one have actually been loaded.
///
/// The window remembers the date the user is looking at (the "focus") rather
/// than the anchor itself, which means that switching from week view to month
/// view and back lands on the same week again.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct CalendarWindow {
    focus: Date,
    mode: Mode,
}

impl CalendarWindow {
    /// Returns a week view of the week (Sunday through Saturday) containing
    /// `today`
    pub(crate) fn new(today: Date) -> CalendarWindow {
        CalendarWindow {
            focus: today,
            mode: Mode::Week,
        }
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    /// The first day shown: the Sunday starting the week in week view, the
    /// first of the month in month view
    pub(crate) fn anchor(&self) -> Date {
        match self.mode {
            Mode::Week => sunday_on_or_before(self.focus),
            Mode::Month => first_of_month(self.focus),
        }
    }

    /// Switches between week and month view.  The month shown is the one
    /// containing the focus date, which may differ from the month of the
    /// week's Sunday; this keeps toggling twice a no-op.
    pub(crate) fn toggle_mode(self) -> CalendarWindow {
        CalendarWindow {
            focus: self.focus,
            mode: self.mode.toggled(),
        }
    }

    /// Moves `step` weeks (in week view) or `step` months (in month view)
    /// forwards, or backwards if `step` is negative.
    pub(crate) fn navigate(self, step: i32) -> Result<CalendarWindow, OutOfTimeError> {
        let focus = match self.mode {
            Mode::Week => self.focus.checked_add(Duration::weeks(i64::from(step))),
            Mode::Month => add_months(first_of_month(self.focus), step),
        }
        .ok_or(OutOfTimeError)?;
        Ok(CalendarWindow {
            focus,
            mode: self.mode,
        })
    }

    pub(crate) fn jump_to(self, date: Date) -> CalendarWindow {
        CalendarWindow {
            focus: date,
            mode: self.mode,
        }
    }

    pub(crate) fn visible_range(&self) -> DateRange {
        let start = self.anchor();
        let end = match self.mode {
            Mode::Week => start.checked_add(Duration::days(6)).unwrap_or(Date::MAX),
            Mode::Month => last_of_month(start),
        };
        DateRange::new(start, end).expect("a window should never end before it starts")
    }

    /// Number of empty cells before the first day in the first row of the
    /// grid
    pub(crate) fn leading_blanks(&self) -> usize {
        usize::from(self.anchor().weekday().number_days_from_sunday())
    }

    pub(crate) fn title(&self) -> String {
        let range = self.visible_range();
        match self.mode {
            Mode::Week => format!("Week: {} → {}", range.start(), range.end()),
            Mode::Month => format!("{} {}", range.start().month(), range.start().year()),
        }
    }
}

/// An inclusive span of days
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub(crate) fn new(start: Date, end: Date) -> Result<DateRange, InvalidDateRange> {
        if end < start {
            Err(InvalidDateRange { start, end })
        } else {
            Ok(DateRange { start, end })
        }
    }

    pub(crate) fn start(&self) -> Date {
        self.start
    }

    pub(crate) fn end(&self) -> Date {
        self.end
    }

    pub(crate) fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    pub(crate) fn days(&self) -> impl Iterator<Item = Date> {
        let end = self.end;
        successors(Some(self.start), move |&d| d.next_day().filter(|&d| d <= end))
    }
}

#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("reached the end of time")]
pub(crate) struct OutOfTimeError;

#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid date range: {end} is before {start}")]
pub(crate) struct InvalidDateRange {
    start: Date,
    end: Date,
}

// Clamped to the beginning of time
fn sunday_on_or_before(date: Date) -> Date {
    let back = date.weekday().number_days_from_sunday();
    date.checked_sub(Duration::days(i64::from(back)))
        .unwrap_or(Date::MIN)
}

fn first_of_month(date: Date) -> Date {
    date.replace_day(1)
        .expect("every month should have a first day")
}

fn last_of_month(date: Date) -> Date {
    add_months(first_of_month(date), 1)
        .and_then(Date::previous_day)
        .unwrap_or(Date::MAX)
}

// Returns the first of the month `step` months after the month of `date`
fn add_months(date: Date, step: i32) -> Option<Date> {
    let index = date
        .year()
        .checked_mul(12)?
        .checked_add(i32::from(u8::from(date.month())) - 1)?
        .checked_add(step)?;
    let month = u8::try_from(index.rem_euclid(12) + 1).ok()?;
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(index.div_euclid(12), month, 1).ok()
}
