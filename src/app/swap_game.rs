mod gesture;
mod mode;
mod replay;
mod round;
mod timers;

pub use replay::{ReplayError, RoundLog, replay};
pub use round::Verdict;

use gesture::{DragTracker, SwipeDirection, recognize};
use mode::Mode;
use round::{Phase, RoundController};

use std::{
    io,
    time::{Duration, Instant},
};

use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    DefaultTerminal, Frame,
    crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Style, Styled, Stylize},
    symbols::border,
    text::Span,
    widgets::{Block, Clear, Paragraph, Widget},
};
use tracing::{debug, warn};

use super::{Game, Session};

// upper bound on how long the screen goes without a redraw
const FRAME_MS: u64 = 50;

pub struct SwapGame<'s> {
    exit: bool,
    mode: Mode,
    clock: Instant,
    drag: DragTracker,
    round: RoundController,
    seed: u64,
    origin_ms: u64,
    session: &'s mut Session,
}

impl<'s> SwapGame<'s> {
    fn new(session: &'s mut Session) -> Self {
        let seed = session.next_seed();
        let round = RoundController::new(&mut StdRng::seed_from_u64(seed), 0);
        Self {
            exit: false,
            mode: Mode::Playing,
            clock: Instant::now(),
            drag: DragTracker::default(),
            round,
            seed,
            origin_ms: 0,
            session,
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }

    fn new_round(&mut self) {
        self.round.teardown();
        self.seed = self.session.next_seed();
        self.origin_ms = self.now_ms();
        self.round = RoundController::new(&mut StdRng::seed_from_u64(self.seed), self.origin_ms);
        self.drag.cancel();
        self.mode = Mode::Playing;
    }

    fn swipe(&mut self, direction: SwipeDirection) {
        let at = self.now_ms();
        debug!(at, ?direction, "swipe");
        if let Some(verdict) = self.round.swipe(at, direction) {
            self.finish(verdict);
        }
    }

    fn finish(&mut self, verdict: Verdict) {
        self.session.tally(verdict);
        self.mode = Mode::Results {
            verdict,
            target: self.round.target(),
            last: self.round.current(),
        };

        let Some(path) = self.session.record_path() else {
            return;
        };
        if let Some(log) = RoundLog::capture(self.seed, self.origin_ms, &self.round) {
            if let Err(e) = log.append(path) {
                warn!(error = %e, "could not write round log");
            }
        }
    }

    fn key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match (self.mode, key.code) {
            (_, KeyCode::Char('q') | KeyCode::Esc) => self.exit = true,
            (Mode::Playing, KeyCode::Left) => self.swipe(SwipeDirection::Left),
            (Mode::Playing, KeyCode::Right) => self.swipe(SwipeDirection::Right),
            (Mode::Results { .. }, KeyCode::Char('r') | KeyCode::Enter) => self.new_round(),
            _ => (),
        }
    }

    fn mouse_event(&mut self, mouse: MouseEvent) {
        if self.mode != Mode::Playing {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag.press(mouse.column, mouse.row, Instant::now());
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some(fling) = self.drag.release(mouse.column, mouse.row, Instant::now()) else {
                    return;
                };
                debug!(vx = fling.velocity_x, vy = fling.velocity_y, "drag released");
                if let Some(direction) = recognize(&fling) {
                    self.swipe(direction);
                }
            }
            _ => (),
        }
    }

    fn poll_timeout(&self) -> Duration {
        self.poll_timeout_at(self.now_ms())
    }

    /// Never sleeps past the next timer, nor longer than a frame while playing.
    fn poll_timeout_at(&self, now: u64) -> Duration {
        match self.mode {
            Mode::Playing => {
                let until_due = self
                    .round
                    .next_due()
                    .map_or(FRAME_MS, |due| due.saturating_sub(now));
                Duration::from_millis(until_due.min(FRAME_MS))
            }
            Mode::Results { .. } => Duration::from_secs(1),
        }
    }
}

impl Game for SwapGame<'_> {
    fn run(terminal: &mut DefaultTerminal, session: &mut Session) -> io::Result<()> {
        let mut game = SwapGame::new(session);

        while !game.exit {
            terminal.draw(|frame| game.draw(frame))?;
            game.handle_input(terminal)?;
        }

        game.round.teardown();
        Ok(())
    }

    fn handle_input(&mut self, _: &mut DefaultTerminal) -> io::Result<()> {
        if event::poll(self.poll_timeout())? {
            match event::read()? {
                event::Event::Key(key) => self.key_event(key),
                event::Event::Mouse(mouse) => self.mouse_event(mouse),
                _ => (),
            }
        }

        if self.mode == Mode::Playing && !self.exit {
            if let Some(verdict) = self.round.advance(self.now_ms()) {
                self.finish(verdict);
            }
        }
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }
}

impl Widget for &SwapGame<'_> {
    fn render(self, area: ratatui::prelude::Rect, buf: &mut ratatui::prelude::Buffer)
    where
        Self: Sized,
    {
        let vert = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Min(0),    // Body
            ])
            .split(area);

        Paragraph::new(Span::from("Swap Game").fg(Color::Red))
            .centered()
            .block(Block::bordered().border_set(border::DOUBLE))
            .render(vert[0], buf);

        let block = Block::bordered().border_set(border::DOUBLE);

        let main = vert[1].inner(Margin {
            horizontal: 1,
            vertical: 1,
        });

        let center = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Countdown
                Constraint::Min(0),
                Constraint::Length(1), // Page
                Constraint::Length(1),
                Constraint::Length(1), // Detail
                Constraint::Min(0),
                Constraint::Length(1), // Help
            ])
            .split(main);

        match self.mode {
            Mode::Playing => match self.round.phase() {
                Phase::Instructing => {
                    block.title("╡ Instruction ╞").render(vert[1], buf);

                    let popup = centered(main, 30, 5);
                    Clear.render(popup, buf);
                    let inner = popup.inner(Margin {
                        horizontal: 1,
                        vertical: 2,
                    });
                    Block::bordered()
                        .border_set(border::ROUNDED)
                        .title("Instruction")
                        .render(popup, buf);
                    Paragraph::new(format!("Allez à : {}", self.round.target()))
                        .centered()
                        .render(inner, buf);
                }
                Phase::Frozen => {
                    block.title("╡ Playing field ╞").render(vert[1], buf);
                    Block::new()
                        .style(Style::default().bg(Color::Black))
                        .render(main, buf);
                }
                Phase::Running | Phase::Ended => {
                    block.title("╡ Playing field ╞").render(vert[1], buf);
                    Block::new()
                        .style(Style::default().bg(Color::White))
                        .render(main, buf);

                    if self.round.countdown_visible() {
                        Paragraph::new(self.round.seconds_remaining().to_string())
                            .centered()
                            .set_style(Color::Black)
                            .render(center[0], buf);
                    }
                    if self.round.page_visible() {
                        Paragraph::new(format!("Page: {}", self.round.current()))
                            .centered()
                            .set_style(Color::Black)
                            .render(center[2], buf);
                    }
                    Paragraph::new("Drag or ←/→ to swap, Esc/'q' to quit")
                        .centered()
                        .set_style(Color::Black)
                        .render(center[6], buf);
                }
            },
            Mode::Results {
                verdict,
                target,
                last,
            } => {
                block.title("╡ Results ╞").render(vert[1], buf);

                let color = if verdict.is_win() {
                    Color::Green
                } else {
                    Color::Red
                };
                Paragraph::new(Span::from(verdict.to_string()).fg(color).bold())
                    .centered()
                    .render(center[2], buf);
                Paragraph::new(format!("Cible: {target}  Page: {last}"))
                    .centered()
                    .render(center[4], buf);

                Paragraph::new("'r' to play again and Esc/'q' to return to the menu")
                    .centered()
                    .render(center[6], buf);
            }
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area)[1];

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vert)[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;
    use super::round::{INSTRUCTION_MS, Side};

    fn press(game: &mut SwapGame<'_>, code: KeyCode) {
        game.key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn arrows_swipe_only_while_playing() {
        let mut session = Session::new(Some(5), None);
        let mut game = SwapGame::new(&mut session);

        press(&mut game, KeyCode::Right);
        press(&mut game, KeyCode::Left);
        assert_eq!(game.round.swipes().len(), 2);
        assert_eq!(game.round.swipes()[0].1, SwipeDirection::Right);
        assert_eq!(game.round.swipes()[1].1, SwipeDirection::Left);
        // still behind the instruction popup
        assert_eq!(game.round.current(), Side::Left);

        game.mode = Mode::Results {
            verdict: Verdict::Lost,
            target: Side::Right,
            last: Side::Left,
        };
        press(&mut game, KeyCode::Right);
        assert_eq!(game.round.swipes().len(), 2);
    }

    #[test]
    fn restart_only_from_results() {
        let mut session = Session::new(Some(6), None);
        let mut game = SwapGame::new(&mut session);
        let seed = game.seed;

        press(&mut game, KeyCode::Char('r'));
        press(&mut game, KeyCode::Enter);
        assert_eq!(game.mode, Mode::Playing);
        assert_eq!(game.seed, seed);

        game.round.run_to_end();
        let verdict = game.round.verdict().unwrap();
        game.finish(verdict);
        assert!(matches!(game.mode, Mode::Results { .. }));

        press(&mut game, KeyCode::Char('r'));
        assert_eq!(game.mode, Mode::Playing);
        assert_ne!(game.seed, seed);
        assert_eq!(game.round.verdict(), None);
        assert!(!game.exit);

        press(&mut game, KeyCode::Esc);
        assert!(game.exit);
    }

    #[test]
    fn poll_timeout_is_capped_by_next_timer() {
        let mut session = Session::new(Some(7), None);
        let mut game = SwapGame::new(&mut session);
        let due = INSTRUCTION_MS;
        assert_eq!(game.round.next_due(), Some(due));

        assert_eq!(game.poll_timeout_at(0), Duration::from_millis(FRAME_MS));
        assert_eq!(game.poll_timeout_at(due - 10), Duration::from_millis(10));
        assert_eq!(game.poll_timeout_at(due + 500), Duration::ZERO);

        game.mode = Mode::Results {
            verdict: Verdict::Won,
            target: Side::Left,
            last: Side::Left,
        };
        assert_eq!(game.poll_timeout_at(due - 10), Duration::from_secs(1));
    }

    #[test]
    fn recorded_rounds_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.jsonl");
        let mut session = Session::new(Some(8), Some(path.clone()));
        let mut game = SwapGame::new(&mut session);

        for _ in 0..2 {
            let verdict = game.round.run_to_end().unwrap();
            game.finish(verdict);
            game.new_round();
        }

        let logs = RoundLog::load_all(&path).unwrap();
        assert_eq!(logs.len(), 2);
        assert_ne!(logs[0].seed, logs[1].seed);
        for log in &logs {
            assert!(replay(log).is_ok());
        }
    }
}
