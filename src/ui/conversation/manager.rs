use std::sync::Arc;

use crate::agent::Responder;
use crate::config::{PersonaDisplay, Theme, UiConfig};
use crate::conversation::{Conversation, Exchange, ExchangeFailure, RejectReason};
use crate::events::TuiEvent;
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, GeneratingIndicator, HistoryView, ParsedCommand,
    SlashCommand, get_help_text,
};
use crate::ui::theme::{Palette, Spacing};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Tallest the composer grows before it scrolls
const MAX_COMPOSER_LINES: usize = 5;

const STATUS_HINT: &str = "Enter send · Shift+Enter new line · /help commands · Ctrl+C quit";

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// A reply being generated on a background task
struct InFlight {
    exchange: Exchange,
    handle: JoinHandle<String>,
}

/// Owns the conversation and the widgets that show it, and runs each reply on
/// its own task so the view keeps redrawing while the service is slow.
pub struct ConversationManager {
    conversation: Conversation,
    composer: ConversationComposer,
    responder: Arc<dyn Responder>,
    persona: PersonaDisplay,
    ui: UiConfig,
    palette: Palette,
    in_flight: Option<InFlight>,
    notice: Option<String>,
    show_help: bool,
    tick: u64,
}

impl ConversationManager {
    pub fn new(responder: Arc<dyn Responder>, persona: PersonaDisplay, ui: UiConfig) -> Self {
        let palette = Palette::for_theme(ui.theme);
        Self {
            conversation: Conversation::new(),
            composer: ConversationComposer::new(persona.placeholder.clone(), palette),
            responder,
            persona,
            ui,
            palette,
            in_flight: None,
            notice: None,
            show_help: false,
            tick: 0,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    /// One-line message shown above the composer, if any
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_help_visible(&self) -> bool {
        self.show_help
    }

    pub fn theme(&self) -> Theme {
        self.ui.theme
    }

    pub fn handle_event(&mut self, event: TuiEvent) -> ConversationAction {
        match event {
            TuiEvent::Key(key) => self.handle_key(key),
            TuiEvent::Paste(text) => {
                self.composer.insert_str(&text);
                ConversationAction::None
            }
            TuiEvent::Resize(..) => ConversationAction::None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ConversationAction::Exit;
        }

        if self.show_help {
            self.show_help = false;
            return ConversationAction::None;
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(text) => {
                self.handle_input(text);
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Send `text` and start generating its reply
    fn handle_input(&mut self, text: String) {
        match self.conversation.begin(&text) {
            Ok(exchange) => {
                self.composer.clear();
                self.notice = None;
                self.tick = 0;

                let responder = Arc::clone(&self.responder);
                let prompt = exchange.prompt().to_string();
                let handle = tokio::spawn(async move { responder.respond(&prompt).await });
                self.in_flight = Some(InFlight { exchange, handle });
            }
            Err(RejectReason::Busy) => {
                self.notice = Some(format!(
                    "{} is still answering. Your message was not sent.",
                    self.persona.display_name
                ));
            }
            Err(RejectReason::Empty) => {}
        }
    }

    /// Resolve once the outstanding reply (if any) has been appended.
    ///
    /// Never resolves while nothing is in flight. Cancelling this future
    /// leaves the exchange outstanding.
    pub async fn wait_for_reply(&mut self) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return std::future::pending().await;
        };

        let outcome = (&mut in_flight.handle)
            .await
            .map_err(ExchangeFailure::from);

        if let Some(in_flight) = self.in_flight.take() {
            self.conversation.complete(in_flight.exchange, outcome);
        }
    }

    /// Advance the typing animation
    pub fn on_tick(&mut self) {
        if self.conversation.is_pending() {
            self.tick = self.tick.wrapping_add(1);
        }
    }

    /// Abort the outstanding reply, if any
    pub fn shutdown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!(exchange = %in_flight.exchange.id(), "aborting outstanding reply");
            in_flight.handle.abort();
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        if self.conversation.is_pending() && !command.command.available_while_pending() {
            self.notice = Some(format!(
                "/{} is unavailable while a reply is on its way.",
                command.command.command()
            ));
            return ConversationAction::None;
        }

        match command.command {
            SlashCommand::Bye => ConversationAction::Exit,
            SlashCommand::Help => {
                self.show_help = true;
                ConversationAction::None
            }
            SlashCommand::Suggest => {
                let suggestion = command
                    .suggestion_index()
                    .and_then(|index| self.persona.suggestions.get(index))
                    .cloned();
                match suggestion {
                    Some(text) => self.handle_input(text),
                    None => {
                        self.notice = Some(format!(
                            "Usage: /suggest 1-{}",
                            self.persona.suggestions.len()
                        ));
                    }
                }
                ConversationAction::None
            }
            SlashCommand::Theme => {
                let target = match command.argument() {
                    None => Some(match self.ui.theme {
                        Theme::Light => Theme::Dark,
                        Theme::Dark => Theme::Light,
                    }),
                    Some(_) => command.theme_target(),
                };
                match target {
                    Some(theme) => self.set_theme(theme),
                    None => self.notice = Some("Usage: /theme <light|dark>".to_string()),
                }
                ConversationAction::None
            }
        }
    }

    fn set_theme(&mut self, theme: Theme) {
        info!(%theme, "theme changed");
        self.ui.theme = theme;
        self.palette = Palette::for_theme(theme);
        self.composer.set_palette(self.palette);
        self.notice = None;
    }

    /// Render the whole chat view
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let palette = self.palette;
        let spacing = Spacing::for_density(self.ui.density);
        buf.set_style(area, Style::default().bg(palette.background).fg(palette.text));

        let composer_height = self.composer.line_count().min(MAX_COMPOSER_LINES) as u16 + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(spacing.header_height), // Header
                Constraint::Min(1),                        // History
                Constraint::Length(1),                     // Indicator / notice
                Constraint::Length(composer_height),       // Composer
                Constraint::Length(1),                     // Status line
            ])
            .split(area);

        self.render_header(chunks[0], buf);

        HistoryView::new(self.conversation.messages(), &self.persona, palette, spacing)
            .render(chunks[1], buf);

        if self.conversation.is_pending() {
            GeneratingIndicator::new(&self.persona.display_name, self.tick, palette)
                .render(chunks[2], buf);
        } else if let Some(notice) = &self.notice {
            let line = Line::from(Span::styled(notice.as_str(), Style::default().fg(palette.notice)));
            buf.set_line(chunks[2].x, chunks[2].y, &line, chunks[2].width);
        }

        self.composer.render(chunks[3], buf);

        let status = Line::from(Span::styled(STATUS_HINT, Style::default().fg(palette.muted)));
        buf.set_line(chunks[4].x, chunks[4].y, &status, chunks[4].width);

        if self.show_help {
            self.render_help(area, buf);
        }
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let palette = self.palette;
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.border));
        let inner = block.inner(area);
        block.render(area, buf);

        let name = Span::styled(
            self.persona.display_name.as_str(),
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        );
        let tagline = Span::styled(self.persona.tagline.as_str(), Style::default().fg(palette.muted));

        let lines = if inner.height >= 2 {
            vec![Line::from(name), Line::from(tagline)]
        } else {
            vec![Line::from(vec![name, Span::raw("  "), tagline])]
        };
        Paragraph::new(lines).render(inner, buf);
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        let help = get_help_text();
        let width = area.width.saturating_sub(4).min(72);
        let height = (help.lines().count() as u16 + 3).min(area.height);
        let popup = Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        };

        Clear.render(popup, buf);
        Paragraph::new(help)
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(self.palette.text).bg(self.palette.background))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help (any key to close)")
                    .border_style(Style::default().fg(self.palette.accent)),
            )
            .render(popup, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::prompts::APOLOGY_REPLY;
    use async_trait::async_trait;

    struct Scripted(&'static str);

    #[async_trait]
    impl Responder for Scripted {
        async fn respond(&self, _user_text: &str) -> String {
            self.0.to_string()
        }
    }

    struct Echo;

    #[async_trait]
    impl Responder for Echo {
        async fn respond(&self, user_text: &str) -> String {
            format!("You asked: {}", user_text)
        }
    }

    struct Panicking;

    #[async_trait]
    impl Responder for Panicking {
        async fn respond(&self, _user_text: &str) -> String {
            panic!("generation task blew up")
        }
    }

    fn manager(responder: impl Responder + 'static) -> ConversationManager {
        let config = Config::default();
        ConversationManager::new(Arc::new(responder), config.persona, config.ui)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_line(manager: &mut ConversationManager, text: &str) -> ConversationAction {
        for c in text.chars() {
            manager.handle_key(press(KeyCode::Char(c)));
        }
        manager.handle_key(press(KeyCode::Enter))
    }

    #[tokio::test]
    async fn submitted_text_gets_a_reply() {
        let mut manager = manager(Scripted("Welcome."));
        type_line(&mut manager, "Hello");

        assert!(manager.conversation().is_pending());
        assert_eq!(manager.composer().content(), "");

        manager.wait_for_reply().await;

        let messages = manager.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content(), "Hello");
        assert_eq!(messages[1].content(), "Welcome.");
        assert!(!manager.conversation().is_pending());
    }

    #[tokio::test]
    async fn busy_submission_is_dropped_and_text_kept() {
        let mut manager = manager(Scripted("Welcome."));
        type_line(&mut manager, "first");
        type_line(&mut manager, "second");

        assert_eq!(manager.conversation().len(), 1);
        assert_eq!(manager.composer().content(), "second");
        assert!(manager.notice().unwrap().contains("still answering"));

        manager.wait_for_reply().await;
        assert_eq!(manager.conversation().len(), 2);

        manager.handle_key(press(KeyCode::Enter));
        assert!(manager.conversation().is_pending());
        assert_eq!(manager.notice(), None);
        manager.wait_for_reply().await;
        assert_eq!(manager.conversation().messages()[2].content(), "second");
    }

    #[tokio::test]
    async fn panicked_task_appends_the_apology() {
        let mut manager = manager(Panicking);
        type_line(&mut manager, "Hello");
        manager.wait_for_reply().await;

        let reply = manager.conversation().last_reply().unwrap();
        assert_eq!(reply.content(), APOLOGY_REPLY);
        assert!(!manager.conversation().is_pending());
    }

    #[tokio::test]
    async fn suggest_sends_the_numbered_suggestion() {
        let mut manager = manager(Echo);
        type_line(&mut manager, "/suggest 2");
        manager.wait_for_reply().await;

        let expected = crate::prompts::SUGGESTIONS[1];
        let messages = manager.conversation().messages();
        assert_eq!(messages[0].content(), expected);
        assert_eq!(messages[1].content(), format!("You asked: {}", expected));
    }

    #[tokio::test]
    async fn suggest_out_of_range_shows_usage() {
        let mut manager = manager(Echo);
        type_line(&mut manager, "/suggest 9");
        assert!(manager.conversation().is_empty());
        assert_eq!(manager.notice(), Some("Usage: /suggest 1-4"));
    }

    #[tokio::test]
    async fn suggest_is_unavailable_while_pending() {
        let mut manager = manager(Echo);
        type_line(&mut manager, "Hello");
        type_line(&mut manager, "/suggest 1");
        assert_eq!(manager.conversation().len(), 1);
        assert!(manager.notice().unwrap().contains("unavailable"));
    }

    #[test]
    fn theme_command_switches_and_toggles() {
        let mut manager = manager(Echo);
        assert_eq!(manager.theme(), Theme::Light);

        type_line(&mut manager, "/theme dark");
        assert_eq!(manager.theme(), Theme::Dark);

        type_line(&mut manager, "/theme");
        assert_eq!(manager.theme(), Theme::Light);

        type_line(&mut manager, "/theme neon");
        assert_eq!(manager.theme(), Theme::Light);
        assert!(manager.notice().is_some());
    }

    #[test]
    fn bye_and_ctrl_c_exit() {
        let mut manager = manager(Echo);
        assert_eq!(type_line(&mut manager, "/bye"), ConversationAction::Exit);
        assert_eq!(
            manager.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            ConversationAction::Exit
        );
    }

    #[test]
    fn help_closes_on_any_key() {
        let mut manager = manager(Echo);
        type_line(&mut manager, "/help");
        assert!(manager.is_help_visible());

        manager.handle_key(press(KeyCode::Char('x')));
        assert!(!manager.is_help_visible());
        assert_eq!(manager.composer().content(), "");
    }

    #[test]
    fn paste_goes_into_the_composer() {
        let mut manager = manager(Echo);
        manager.handle_event(TuiEvent::Paste("line one\r\nline two".to_string()));
        assert_eq!(manager.composer().content(), "line one\nline two");
    }

    #[test]
    fn renders_header_empty_state_and_placeholder() {
        let manager = manager(Echo);
        let area = Rect::new(0, 0, 100, 24);
        let mut buf = Buffer::empty(area);
        manager.render(area, &mut buf);

        let screen: String = (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");

        assert!(screen.contains("Larry Agran"));
        assert!(screen.contains("Former Mayor of Irvine"));
        assert!(screen.contains("1. What are your views"));
        assert!(screen.contains("Message Larry Agran..."));
    }
}
