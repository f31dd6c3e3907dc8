use crate::ui::conversation::commands::{
    CommandEntry, ParsedCommand, command_entries, parse_slash_command,
};
use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Text to send. The composer keeps it until [`ConversationComposer::clear`]
    /// is called, so a rejected submission is not lost.
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Byte offset into `content`, always on a char boundary
    pub cursor_position: usize,
}

impl TextAreaState {
    fn prev_boundary(&self) -> usize {
        self.content[..self.cursor_position]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.content[self.cursor_position..]
            .chars()
            .next()
            .map(|c| self.cursor_position + c.len_utf8())
            .unwrap_or(self.cursor_position)
    }
}

/// Conversation composer for user input
#[derive(Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    palette: Palette,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    pub fn new(placeholder: String, palette: Palette) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder,
            palette,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if self.show_command_palette
                    && parse_slash_command(&self.state.content).is_none()
                    && self.apply_selected_command()
                {
                    return ComposerResult::None;
                } else if !self.state.content.trim().is_empty() {
                    self.close_command_palette();
                    if let Some(command) = parse_slash_command(&self.state.content) {
                        self.clear();
                        return ComposerResult::Command(command);
                    }
                    return ComposerResult::Submitted(self.state.content.clone());
                }
            }
            KeyCode::Up if self.show_command_palette => {
                self.move_command_selection(-1);
            }
            KeyCode::Down if self.show_command_palette => {
                self.move_command_selection(1);
            }
            KeyCode::Esc if self.show_command_palette => {
                self.close_command_palette();
            }
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
                self.sync_command_palette();
            }
            KeyCode::Backspace => {
                if self.backspace() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Delete => {
                if self.delete() {
                    self.sync_command_palette();
                }
            }
            KeyCode::Left => {
                self.state.cursor_position = self.state.prev_boundary();
            }
            KeyCode::Right => {
                self.state.cursor_position = self.state.next_boundary();
            }
            KeyCode::Home => {
                self.state.cursor_position = 0;
            }
            KeyCode::End => {
                self.state.cursor_position = self.state.content.len();
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.state
            .content
            .insert_str(self.state.cursor_position, &normalized);
        self.state.cursor_position += normalized.len();
        self.sync_command_palette();
    }

    /// Insert a character at the cursor position
    fn insert_char(&mut self, c: char) {
        self.state.content.insert(self.state.cursor_position, c);
        self.state.cursor_position += c.len_utf8();
    }

    /// Delete character before cursor
    fn backspace(&mut self) -> bool {
        if self.state.cursor_position == 0 {
            return false;
        }
        let start = self.state.prev_boundary();
        self.state.content.replace_range(start..self.state.cursor_position, "");
        self.state.cursor_position = start;
        true
    }

    /// Delete character at cursor
    fn delete(&mut self) -> bool {
        let end = self.state.next_boundary();
        if end == self.state.cursor_position {
            return false;
        }
        self.state.content.replace_range(self.state.cursor_position..end, "");
        true
    }

    /// Open, refresh or close the palette to match the current content
    fn sync_command_palette(&mut self) {
        let content = &self.state.content;
        let typing_command = content.starts_with('/') && !content.contains(char::is_whitespace);
        if typing_command {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette();
        } else if self.show_command_palette {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.state.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected_command = Some(next as usize);
    }

    fn apply_selected_command(&mut self) -> bool {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index).copied())
        else {
            return false;
        };

        self.state.content = format!("/{} ", entry.keyword);
        self.state.cursor_position = self.state.content.len();
        self.close_command_palette();
        true
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// Get current content
    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Number of text lines currently in the composer
    pub fn line_count(&self) -> usize {
        self.state.content.split('\n').count()
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }

    /// First line to draw so the cursor line fits in `height` rows,
    /// showing as much of the end of the draft as possible
    fn first_visible_line(&self, height: usize) -> usize {
        let cursor_line = self.state.content[..self.state.cursor_position]
            .matches('\n')
            .count();
        (cursor_line + 1).saturating_sub(height)
    }

    /// Clear content
    pub fn clear(&mut self) {
        self.state = TextAreaState::default();
        self.close_command_palette();
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let palette = self.palette;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent));

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(palette.muted),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.state.content.clone();
            content.insert(self.state.cursor_position.min(content.len()), '▌');

            let height = inner_area.height as usize;
            let start = self.first_visible_line(height);
            for (i, line_text) in content.split('\n').skip(start).take(height).enumerate() {
                let line = Line::from(vec![Span::styled(
                    line_text,
                    Style::default().fg(palette.text),
                )]);
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if self.show_command_palette && !self.filtered_commands.is_empty() {
            let palette_height = (self.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: area.x,
                y: area.y.saturating_sub(palette_height),
                width: area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            Clear.render(palette_area, buf);
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(palette.accent).bg(palette.background));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default()
                        .fg(palette.background)
                        .bg(palette.selection)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(palette.text)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled(" - ", Style::default().fg(palette.muted)),
                    Span::styled(entry.description, Style::default().fg(palette.muted)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}
