use crate::conversation::{CompletionBackend, ConversationStore, PendingCycle};
use crate::types::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};
use std::sync::Arc;
use std::{io, time::Duration};
use tokio::sync::mpsc;

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Everything the screen shows, minus the terminal itself.
#[derive(Debug, Default)]
pub struct ChatState {
    pub store: ConversationStore,
    pub input: String,
    pub should_quit: bool,
    pub tick: usize,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one key press. Returns a cycle to dispatch when Enter
    /// submitted a non-blank message. Editing is frozen while busy.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<PendingCycle> {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            _ if self.store.is_busy() => {}
            KeyCode::Enter => {
                let text = self.input.trim().to_string();
                let pending = self.store.begin(&text);
                if pending.is_some() {
                    self.input.clear();
                }
                return pending;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        None
    }

    pub fn apply_reply(&mut self, outcome: Result<Turn>) {
        self.store.finish(outcome);
    }
}

pub struct App {
    backend: Arc<dyn CompletionBackend>,
    state: ChatState,
}

impl App {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            state: ChatState::new(),
        }
    }

    pub async fn run(mut self) -> io::Result<()> {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let mut stdout = io::stdout();
            let _ = execute!(stdout, LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::channel::<Result<Turn>>(1);

        loop {
            terminal.draw(|f| self.render(f))?;

            if crossterm::event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if let Some(pending) = self.state.handle_key(key) {
                            self.dispatch(pending, tx.clone());
                        }
                    }
                    Event::Resize(_, _) => terminal.autoresize()?,
                    _ => {}
                }
            }

            self.state.tick = self.state.tick.wrapping_add(1);

            while let Ok(outcome) = rx.try_recv() {
                self.state.apply_reply(outcome);
            }

            if self.state.should_quit {
                break;
            }
        }

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    fn dispatch(&self, pending: PendingCycle, tx: mpsc::Sender<Result<Turn>>) {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            let outcome = backend.complete(&pending.turns).await;
            if tx.send(outcome).await.is_err() {
                tracing::warn!("Reply arrived after the chat screen closed");
            }
        });
    }

    fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(0),    // Messages
                Constraint::Length(3), // Input
                Constraint::Length(1), // Footer
            ])
            .split(f.size());

        self.render_header(f, chunks[0]);
        self.render_messages(f, chunks[1]);
        self.render_input(f, chunks[2]);
        self.render_footer(f, chunks[3]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header = format!(" 💬 Chat Bot  |  {} turns ", self.state.store.len());
        f.render_widget(
            Paragraph::new(header).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            area,
        );
    }

    fn render_messages(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray));

        if self.state.store.is_empty() {
            let hint = Paragraph::new(vec![
                Line::from("Say hello or ask anything."),
                Line::from(""),
                Line::from(Span::styled(
                    "Type below to get started",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .alignment(Alignment::Center)
            .block(block);
            f.render_widget(hint, area);
            return;
        }

        let mut lines: Vec<Line> = Vec::new();
        for turn in self.state.store.turns() {
            let (label, color) = match turn.role() {
                Role::User => ("You", Color::Green),
                Role::Assistant => ("Bot", Color::Magenta),
            };
            lines.push(Line::from(Span::styled(
                format!("{}:", label),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            for text_line in turn.content().lines() {
                lines.push(Line::from(format!("  {}", text_line)));
            }
            lines.push(Line::from(""));
        }
        if self.state.store.is_busy() {
            let frame = SPINNER[self.state.tick % SPINNER.len()];
            lines.push(Line::from(Span::styled(
                format!("{} thinking…", frame),
                Style::default().fg(Color::DarkGray),
            )));
        }

        let inner_width = area.width.saturating_sub(2).max(1);
        let inner_height = area.height.saturating_sub(2) as usize;
        let p = Paragraph::new(lines).wrap(Wrap { trim: false });
        let scroll = wrapped_height(&p, inner_width).saturating_sub(inner_height) as u16;

        f.render_widget(p.block(block).scroll((scroll, 0)), area);
    }

    fn render_input(&self, f: &mut Frame, area: Rect) {
        let busy = self.state.store.is_busy();
        let (title, style) = if busy {
            (" waiting for reply ", Style::default().fg(Color::DarkGray))
        } else {
            (" message ", Style::default().fg(Color::White))
        };
        let p = Paragraph::new(self.state.input.as_str()).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title)
                .border_style(style),
        );
        f.render_widget(p, area);
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        f.render_widget(
            Paragraph::new(" Enter: send  |  Esc / Ctrl-C: quit ")
                .style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }
}

/// Rows a wrapped paragraph occupies at `width` columns, counted by the same
/// word wrapper that renders it. Call before attaching the border block.
fn wrapped_height(paragraph: &Paragraph, width: u16) -> usize {
    paragraph.line_count(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(state: &mut ChatState, text: &str) {
        for c in text.chars() {
            assert!(state.handle_key(key(KeyCode::Char(c))).is_none());
        }
    }

    #[test]
    fn test_enter_submits_and_clears_input() {
        let mut state = ChatState::new();
        type_text(&mut state, "hello");
        let pending = state.handle_key(key(KeyCode::Enter));
        match pending {
            Some(p) => assert_eq!(p.turns, vec![Turn::user("hello")]),
            None => panic!("expected a cycle"),
        }
        assert!(state.input.is_empty());
        assert!(state.store.is_busy());
    }

    #[test]
    fn test_enter_on_blank_input_does_nothing() {
        let mut state = ChatState::new();
        type_text(&mut state, "   ");
        assert!(state.handle_key(key(KeyCode::Enter)).is_none());
        assert!(state.store.is_empty());
        assert_eq!(state.input, "   ");
    }

    #[test]
    fn test_input_frozen_while_busy() {
        let mut state = ChatState::new();
        type_text(&mut state, "hi");
        let _ = state.handle_key(key(KeyCode::Enter));

        assert!(state.handle_key(key(KeyCode::Char('x'))).is_none());
        assert!(state.handle_key(key(KeyCode::Enter)).is_none());
        assert!(state.input.is_empty());
        assert_eq!(state.store.len(), 1);

        state.apply_reply(Ok(Turn::assistant("hey")));
        assert!(!state.store.is_busy());
        type_text(&mut state, "x");
        assert_eq!(state.input, "x");
    }

    #[test]
    fn test_quit_keys_work_while_busy() {
        let mut state = ChatState::new();
        type_text(&mut state, "hi");
        let _ = state.handle_key(key(KeyCode::Enter));
        let _ = state.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(state.should_quit);
    }

    #[test]
    fn test_backspace_edits_input() {
        let mut state = ChatState::new();
        type_text(&mut state, "hey");
        let _ = state.handle_key(key(KeyCode::Backspace));
        assert_eq!(state.input, "he");
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdef"), Line::from(""), Line::from("abc")];
        let p = Paragraph::new(lines).wrap(Wrap { trim: false });
        assert_eq!(wrapped_height(&p, 3), 2 + 1 + 1);
    }

    #[test]
    fn test_wrapped_height_counts_word_wrapping() {
        // 15 columns of text fit in 3 rows by width, but words break at 5.
        let p = Paragraph::new(vec![Line::from("aa bbbb cc dddd")]).wrap(Wrap { trim: false });
        assert!(wrapped_height(&p, 5) >= 4);
    }
}
