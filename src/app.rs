use crate::calendar::{Calendar, CalendarGrid};
use crate::help::Help;
use crate::jumpto::{JumpTo, JumpToInput, JumpToOutput, JumpToState};
use crate::theme::{BASE_STYLE, ERROR_STYLE, STATUS_STYLE};
use crate::tickets::{Completion, CompletionPolicy, DaySummaries, TicketAggregator, TicketSource};
use crate::window::CalendarWindow;
use crossterm::event::{read, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{StatefulWidget, Widget},
    Terminal,
};
use std::io::{self, Write};
use time::{Date, OffsetDateTime};

/// A ticket calendar session.
///
/// The app only ever replaces its window together with the summaries for
/// that window, so what is on screen always matches the last successful
/// query.
#[derive(Clone, Debug)]
pub(crate) struct App<S, C = CompletionPolicy> {
    today: Date,
    clock: fn() -> Option<Date>,
    window: CalendarWindow,
    summaries: DaySummaries,
    tickets: TicketAggregator<S, C>,
    error: Option<String>,
    state: AppState,
}

impl<S: TicketSource, C: Completion> App<S, C> {
    pub(crate) fn new(today: Date, window: CalendarWindow, tickets: TicketAggregator<S, C>) -> Self {
        App {
            today,
            clock: local_today,
            window,
            summaries: DaySummaries::new(),
            tickets,
            error: None,
            state: AppState::Calendar,
        }
    }

    pub(crate) fn run<B: Backend>(mut self, mut terminal: Terminal<B>) -> io::Result<()> {
        self.reload();
        while !self.quitting() {
            self.draw(&mut terminal)?;
            self.handle_input()?;
        }
        Ok(())
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        terminal.draw(|frame| frame.render_widget(self, frame.area()))?;
        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        let normal_modifiers = KeyModifiers::NONE | KeyModifiers::SHIFT;
        if let Some(KeyEvent {
            code, modifiers, ..
        }) = read()?.as_key_press_event()
        {
            if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
                self.state = AppState::Quitting;
            } else if !normal_modifiers.contains(modifiers) || !self.handle_key(code) {
                self.beep()?;
            }
        }
        // else: Redraw on resize, and we might as well redraw on other stuff
        // too
        Ok(())
    }

    // Returns `false` if the user pressed an invalid key or the command could
    // not be carried out
    fn handle_key(&mut self, key: KeyCode) -> bool {
        match &mut self.state {
            AppState::Calendar => match key {
                KeyCode::Char('h') | KeyCode::Left => self.navigate(-1),
                KeyCode::Char('l') | KeyCode::Right => self.navigate(1),
                KeyCode::Char('m') => self.show(self.window.toggle_mode()),
                KeyCode::Char('0') | KeyCode::Home => self.show(self.window.jump_to(self.today)),
                KeyCode::Char('r') => self.reload(),
                KeyCode::Char('g') => {
                    self.state = AppState::Jumping(JumpToState::new());
                    true
                }
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.state = AppState::Quitting;
                    true
                }
                KeyCode::Char('?') => {
                    self.state = AppState::Helping;
                    true
                }
                _ => false,
            },
            AppState::Helping => {
                self.state = AppState::Calendar;
                true
            }
            AppState::Jumping(state) => {
                if matches!(key, KeyCode::Char('q' | 'g') | KeyCode::Esc) {
                    self.state = AppState::Calendar;
                    true
                } else {
                    let output = match key {
                        KeyCode::Char(c) => match c.to_digit(10).map(u8::try_from) {
                            Some(Ok(d)) => state.handle_input(JumpToInput::Digit(d)),
                            _ => JumpToOutput::Invalid,
                        },
                        KeyCode::Backspace | KeyCode::Delete => {
                            state.handle_input(JumpToInput::Backspace)
                        }
                        KeyCode::Enter => state.handle_input(JumpToInput::Enter),
                        _ => JumpToOutput::Invalid,
                    };
                    match output {
                        JumpToOutput::Ok => true,
                        JumpToOutput::Invalid => false,
                        JumpToOutput::Jump(date) => {
                            self.state = AppState::Calendar;
                            self.show(self.window.jump_to(date))
                        }
                    }
                }
            }
            AppState::Quitting => false,
        }
    }

    fn beep(&self) -> io::Result<()> {
        io::stdout().write_all(b"\x07")
    }

    fn quitting(&self) -> bool {
        self.state == AppState::Quitting
    }

    fn navigate(&mut self, step: i32) -> bool {
        match self.window.navigate(step) {
            Ok(window) => self.show(window),
            Err(_) => false,
        }
    }

    fn reload(&mut self) -> bool {
        self.show(self.window)
    }

    // Loads the tickets for `window` and switches to it.  If the tickets
    // cannot be loaded, the previous window stays on screen.
    fn show(&mut self, window: CalendarWindow) -> bool {
        self.refresh_today();
        match self.tickets.summarize(window.visible_range()) {
            Ok(summaries) => {
                self.window = window;
                self.summaries = summaries;
                self.error = None;
                true
            }
            Err(e) => {
                log::error!("failed to load tickets for {}: {e}", window.title());
                self.error = Some(format!("Ticket data unavailable: {e}"));
                false
            }
        }
    }

    // The session may run past midnight.
    fn refresh_today(&mut self) {
        if let Some(today) = (self.clock)() {
            if today != self.today {
                log::info!("local date changed from {} to {today}", self.today);
                self.today = today;
                self.tickets.set_today(today);
            }
        }
    }

    fn status_line(&self) -> Line<'static> {
        match self.error {
            Some(ref msg) => Line::styled(msg.clone(), ERROR_STYLE),
            None => Line::styled("Press ? for help", STATUS_STYLE),
        }
    }
}

impl<S: TicketSource, C: Completion> Widget for &mut App<S, C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, BASE_STYLE);
        let [cal_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);
        let grid = CalendarGrid::new(&self.window, &self.summaries);
        let title = self.window.title();
        Calendar::new(&grid, &title, self.today).render(cal_area, buf);
        self.status_line().render(status_area, buf);
        if self.state == AppState::Helping {
            Help.render(area, buf);
        } else if let AppState::Jumping(ref mut state) = self.state {
            JumpTo.render(area, buf, state);
        }
    }
}

/// The current local date, or `None` if the local UTC offset cannot be
/// determined
fn local_today() -> Option<Date> {
    OffsetDateTime::now_local().ok().map(OffsetDateTime::date)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AppState {
    Calendar,
    Helping,
    Jumping(JumpToState),
    Quitting,
}
