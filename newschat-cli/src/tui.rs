//! Interactive chat TUI
//!
//! The UI loop owns the terminal and a render copy of the conversation;
//! the controller runs on a worker task and streams snapshots back, so a
//! slow backend never blocks the event loop. Commands are queued, which
//! serializes overlapping sends.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::sync::mpsc;

use newschat_client::{BackendClient, ChatController, ConversationSnapshot, HealthMonitor};
use newschat_core::config::{Config, ConfigLoader};
use newschat_core::{FileSessionStore, Message, Sender};

/// Commands sent from the UI loop to the controller worker
enum ChatCommand {
    Initialize,
    Send(String),
    Reset,
}

struct TuiApp {
    base_url: String,
    input: String,
    messages: Vec<Message>,
    typing: bool,
    session: Option<String>,
    backend_ready: bool,
    scroll_up: u16,
    should_quit: bool,
}

impl TuiApp {
    fn new(base_url: String) -> Self {
        Self {
            base_url,
            input: String::new(),
            messages: Vec::new(),
            typing: false,
            session: None,
            backend_ready: false,
            scroll_up: 0,
            should_quit: false,
        }
    }

    fn apply_snapshot(&mut self, snapshot: ConversationSnapshot) {
        self.session = snapshot.session;
        self.messages = snapshot.messages;
        self.typing = snapshot.typing;
        self.scroll_up = 0;
    }
}

pub async fn run(loader: &ConfigLoader, config: &Config) -> Result<()> {
    let client = BackendClient::new(
        config.backend.base_url.clone(),
        Duration::from_secs(config.backend.request_timeout_s),
    );
    let monitor = HealthMonitor::start(
        client.clone(),
        Duration::from_secs(config.backend.ping_interval_s),
    );
    let health_rx = monitor.subscribe();

    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<ConversationSnapshot>();
    let store = FileSessionStore::new(loader.config_dir());
    let mut controller = ChatController::new(client, Box::new(store)).with_updates(update_tx);

    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<ChatCommand>();
    tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match command {
                ChatCommand::Initialize => controller.initialize().await,
                ChatCommand::Send(text) => controller.send(&text).await,
                ChatCommand::Reset => controller.reset().await,
            }
        }
    });

    // Initialize once the backend answers its first ping
    {
        let command_tx = command_tx.clone();
        let mut ready_rx = monitor.subscribe();
        tokio::spawn(async move {
            while !*ready_rx.borrow() {
                if ready_rx.changed().await.is_err() {
                    return;
                }
            }
            let _ = command_tx.send(ChatCommand::Initialize);
        });
    }

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = TuiApp::new(config.backend.base_url.clone());
    loop {
        while let Ok(snapshot) = update_rx.try_recv() {
            app.apply_snapshot(snapshot);
        }
        app.backend_ready = *health_rx.borrow();

        terminal.draw(|frame| draw(frame, &app))?;

        if event::poll(Duration::from_millis(60))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.should_quit = true;
                    }
                    KeyCode::Esc => app.should_quit = true,
                    KeyCode::PageUp | KeyCode::Up => {
                        app.scroll_up = app.scroll_up.saturating_add(1);
                    }
                    KeyCode::PageDown | KeyCode::Down => {
                        app.scroll_up = app.scroll_up.saturating_sub(1);
                    }
                    KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                        app.input.push('\n');
                    }
                    KeyCode::Enter => {
                        let content = app.input.trim().to_string();
                        app.input.clear();
                        if content.is_empty() {
                            continue;
                        }
                        if content == "/quit" {
                            app.should_quit = true;
                        } else if content == "/reset" {
                            let _ = command_tx.send(ChatCommand::Reset);
                        } else {
                            let _ = command_tx.send(ChatCommand::Send(content));
                        }
                    }
                    KeyCode::Backspace => {
                        app.input.pop();
                    }
                    KeyCode::Char(ch) => {
                        app.input.push(ch);
                    }
                    _ => {}
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    monitor.stop();
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn draw(frame: &mut Frame, app: &TuiApp) {
    // Until the first snapshot arrives there is nothing to render
    if app.messages.is_empty() {
        draw_waiting_screen(frame, app);
        return;
    }

    let mut constraints = vec![
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(3),
    ];
    if !app.backend_ready {
        constraints.insert(0, Constraint::Length(1));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    let mut index = 0;
    if !app.backend_ready {
        frame.render_widget(
            Paragraph::new("Backend service is not responding")
                .style(Style::default().fg(Color::Black).bg(Color::Yellow)),
            chunks[index],
        );
        index += 1;
    }

    let session = app.session.as_deref().unwrap_or("-");
    let status = if app.typing { "bot is typing…" } else { "ready" };
    let header = format!(
        "backend: {} | session: {} | {}",
        app.base_url, session, status
    );
    frame.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL).title("newschat")),
        chunks[index],
    );

    let timeline_area = chunks[index + 1];
    let lines = message_lines(&app.messages, app.typing);
    let viewport = timeline_area.height.saturating_sub(2);
    let auto_scroll = (lines.len() as u16).saturating_sub(viewport);
    let scroll = auto_scroll.saturating_sub(app.scroll_up);
    let timeline = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("conversation"))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(timeline, timeline_area);

    let input_area = chunks[index + 2];
    frame.render_widget(
        Paragraph::new(app.input.clone())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("input (Enter send, /reset new session, /quit exit)"),
            )
            .wrap(Wrap { trim: false }),
        input_area,
    );
    frame.set_cursor_position((
        input_area.x + 1 + app.input.len() as u16,
        input_area.y + 1,
    ));
}

fn draw_waiting_screen(frame: &mut Frame, app: &TuiApp) {
    let area = centered_area(frame.area());
    let lines = vec![
        Line::from(Span::styled(
            "Waking up the backend service...",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("waiting for {}", app.base_url),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "This may take up to 30 seconds on first load",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines).alignment(ratatui::layout::Alignment::Center),
        area,
    );
}

fn centered_area(area: Rect) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(4),
            Constraint::Percentage(40),
        ])
        .split(area);
    chunks[1]
}

/// Render the conversation into display lines
fn message_lines(messages: &[Message], typing: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        let (label, color) = match message.sender {
            Sender::User => ("you", Color::Cyan),
            Sender::Bot => ("bot", Color::Green),
        };
        let mut text_lines = message.text.lines();
        let first = text_lines.next().unwrap_or_default().to_string();
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", label), Style::default().fg(color)),
            Span::raw(first),
        ]));
        for rest in text_lines {
            lines.push(Line::from(Span::raw(format!("      {}", rest))));
        }
        for item in &message.context {
            lines.push(Line::from(Span::styled(
                format!("      ↳ {} ({})", item.title, item.url),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    if typing {
        lines.push(Line::from(Span::styled(
            "[bot] is typing…",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}
