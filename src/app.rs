mod swap_game;

pub use swap_game::{ReplayError, RoundLog, replay};

use std::{io, path::PathBuf, time::Duration};

use rand::{Rng, SeedableRng, rng, rngs::StdRng};
use ratatui::{
    DefaultTerminal, Frame,
    crossterm::event::{self, KeyCode, KeyEventKind},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Styled},
    symbols::border,
    widgets::{Block, Paragraph, Widget},
};
use tracing::info;

use swap_game::{SwapGame, Verdict};

pub const DIR_NAME: &str = "SwapGame";

pub trait Game {
    fn run(terminal: &mut DefaultTerminal, session: &mut Session) -> io::Result<()>;
    fn handle_input(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()>;
    fn draw(&self, frame: &mut Frame);
}

/// State that outlives a single round: where targets come from and how the player is doing.
#[derive(Debug, Clone)]
pub struct Session {
    rng: StdRng,
    record: Option<PathBuf>,
    won: u32,
    lost: u32,
}

impl Session {
    pub fn new(seed: Option<u64>, record: Option<PathBuf>) -> Self {
        let seed = seed.unwrap_or_else(|| rng().random());
        info!(seed, "session started");
        Self {
            rng: StdRng::seed_from_u64(seed),
            record,
            won: 0,
            lost: 0,
        }
    }

    /// Each round gets its own seed so a single round can be replayed on its own.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.random()
    }

    pub fn record_path(&self) -> Option<&PathBuf> {
        self.record.as_ref()
    }

    pub fn tally(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Won => self.won += 1,
            Verdict::Lost => self.lost += 1,
        }
    }
}

pub struct Menu {
    exit: bool,
    index: i8,
    session: Session,
}

impl Menu {
    pub fn new(session: Session) -> Self {
        Self {
            exit: false,
            index: 0,
            session,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        while !self.exit {
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_input(terminal)?;
        }

        Ok(())
    }

    fn handle_input(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        if event::poll(Duration::from_millis(250))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(());
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => self.exit = true,
                    KeyCode::Enter => self.go(terminal)?,
                    KeyCode::Right => self.index = (self.index + 1).min(1),
                    KeyCode::Left => self.index = (self.index - 1).max(0),
                    _ => (),
                }
            }
        }
        Ok(())
    }

    fn go(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        match self.index {
            0 => SwapGame::run(terminal, &mut self.session)?,
            _ => self.exit = true,
        }
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }
}

impl Widget for &Menu {
    fn render(self, area: ratatui::prelude::Rect, buf: &mut ratatui::prelude::Buffer)
    where
        Self: Sized,
    {
        let vert = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Min(0),    // ---
                Constraint::Length(5), // Buttons
                Constraint::Length(1), // Score
                Constraint::Min(0),    // ---
            ])
            .split(area);

        let row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(0),         // ---
                Constraint::Percentage(25), // Play
                Constraint::Percentage(25), // Quit
                Constraint::Min(0),         // ---
            ])
            .split(vert[2]);

        Paragraph::new("SwapGame-CLI")
            .set_style(Color::Blue)
            .centered()
            .block(Block::bordered().border_set(border::DOUBLE))
            .render(vert[0], buf);

        widget("Jouer", self.index == 0, row[1], buf);
        widget("Quitter", self.index == 1, row[2], buf);

        Paragraph::new(format!(
            "Gagné: {}  Perdu: {}",
            self.session.won, self.session.lost
        ))
        .centered()
        .render(vert[3], buf);
    }
}

fn widget(text: &str, color: bool, area: Rect, buf: &mut ratatui::prelude::Buffer) {
    let p = Paragraph::new(text)
        .centered()
        .block(Block::bordered().border_set(border::THICK));
    if color {
        p.set_style(Color::LightRed).render(area, buf);
    } else {
        p.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sessions_repeat() {
        let mut a = Session::new(Some(99), None);
        let mut b = Session::new(Some(99), None);
        let xs: Vec<u64> = (0..4).map(|_| a.next_seed()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.next_seed()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn tally_counts_verdicts() {
        let mut s = Session::new(Some(1), None);
        s.tally(Verdict::Won);
        s.tally(Verdict::Lost);
        s.tally(Verdict::Lost);
        assert_eq!((s.won, s.lost), (1, 2));
    }
}
