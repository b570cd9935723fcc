mod grid;
mod widget;
pub(crate) use self::grid::CalendarGrid;
pub(crate) use self::widget::Calendar;
