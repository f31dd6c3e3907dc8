//! Conversation history display component

use crate::config::PersonaDisplay;
use crate::conversation::Message;
use crate::ui::theme::{Palette, Spacing};
use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Share of the available width a message bubble may use
const BUBBLE_WIDTH_PERCENT: usize = 80;

/// Read-only view over the conversation, newest messages at the bottom
pub struct HistoryView<'a> {
    messages: &'a [Message],
    persona: &'a PersonaDisplay,
    palette: Palette,
    spacing: Spacing,
}

impl<'a> HistoryView<'a> {
    pub fn new(
        messages: &'a [Message],
        persona: &'a PersonaDisplay,
        palette: Palette,
        spacing: Spacing,
    ) -> Self {
        Self {
            messages,
            persona,
            palette,
            spacing,
        }
    }

    fn empty_state_lines(&self, width: usize) -> Vec<Line<'a>> {
        let palette = self.palette;
        let mut lines = Vec::new();
        for row in wrap_text(&self.persona.hint, width) {
            lines.push(Line::from(Span::styled(row, Style::default().fg(palette.muted))));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Try one of these (/suggest <n>):",
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        )));
        for (i, suggestion) in self.persona.suggestions.iter().enumerate() {
            let prefix = format!("  {}. ", i + 1);
            let rows = wrap_text(suggestion, width.saturating_sub(prefix.chars().count()));
            for (j, row) in rows.into_iter().enumerate() {
                let lead = if j == 0 {
                    prefix.clone()
                } else {
                    " ".repeat(prefix.chars().count())
                };
                lines.push(Line::from(vec![
                    Span::styled(lead, Style::default().fg(palette.accent)),
                    Span::styled(row, Style::default().fg(palette.text)),
                ]));
            }
        }
        lines
    }

    /// Render a single message into lines
    fn message_lines(&self, message: &Message, width: usize) -> Vec<Line<'a>> {
        let palette = self.palette;
        let bubble_width = (width * BUBBLE_WIDTH_PERCENT / 100).max(1);
        let time = message
            .timestamp()
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string();
        let rows = wrap_text(message.content(), bubble_width);

        let mut lines = Vec::with_capacity(rows.len() + 1);
        if message.is_user() {
            let style = Style::default().fg(palette.user);
            for row in rows {
                lines.push(right_aligned(row, width, style));
            }
            lines.push(right_aligned(time, width, Style::default().fg(palette.muted)));
        } else {
            lines.push(Line::from(vec![
                Span::styled(
                    self.persona.display_name.clone(),
                    Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" · {}", time), Style::default().fg(palette.muted)),
            ]));
            let style = Style::default().fg(palette.assistant);
            for row in rows {
                lines.push(Line::from(Span::styled(row, style)));
            }
        }
        lines
    }
}

fn right_aligned(text: String, width: usize, style: Style) -> Line<'static> {
    let pad = width.saturating_sub(text.chars().count());
    Line::from(vec![Span::raw(" ".repeat(pad)), Span::styled(text, style)])
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = area.width as usize;
        if width == 0 || area.height == 0 {
            return;
        }

        let all_lines = if self.messages.is_empty() {
            self.empty_state_lines(width)
        } else {
            let mut all_lines: Vec<Line> = Vec::new();
            for (i, message) in self.messages.iter().enumerate() {
                if i > 0 {
                    for _ in 0..self.spacing.message_gap {
                        all_lines.push(Line::from(""));
                    }
                }
                all_lines.extend(self.message_lines(message, width));
            }
            all_lines
        };

        // Bottom-anchored: show the newest lines that fit
        let height = area.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(area.x, area.y + i as u16, line, area.width);
        }
    }
}

/// Wrap `text` to `width` columns.
///
/// Explicit newlines are kept, runs of spaces inside a line collapse, and
/// words longer than `width` are split. A line holding only whitespace keeps
/// its blanks so that whitespace-only content still takes up a row.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        if !paragraph.is_empty() && paragraph.trim().is_empty() {
            lines.push(paragraph.chars().take(width).collect());
            continue;
        }

        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current_line));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            if current_len > 0 {
                current_line.push(' ');
                current_len += 1;
            }
            current_line.extend(word.iter());
            current_len += word.len();
        }

        lines.push(current_line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Density, Theme};
    use crate::conversation::Conversation;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf.get(x, y).symbol().to_string())
            .collect()
    }

    fn render(messages: &[Message], width: u16, height: u16) -> Buffer {
        let persona = PersonaDisplay::default();
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        HistoryView::new(
            messages,
            &persona,
            Palette::for_theme(Theme::Light),
            Spacing::for_density(Density::Comfortable),
        )
        .render(area, &mut buf);
        buf
    }

    #[test]
    fn wrap_keeps_newlines_and_splits_long_words() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_text("", 5), vec![""]);
    }

    #[test]
    fn wrap_keeps_whitespace_only_lines() {
        assert_eq!(wrap_text("   ", 10), vec!["   "]);
        assert_eq!(wrap_text("\t\t", 1), vec!["\t"]);
        assert_eq!(wrap_text("a\n  \nb", 10), vec!["a", "  ", "b"]);
    }

    #[test]
    fn wrap_counts_characters_not_bytes() {
        assert_eq!(wrap_text("ééé ééé", 3), vec!["ééé", "ééé"]);
    }

    #[test]
    fn empty_history_shows_hint_and_numbered_suggestions() {
        let buf = render(&[], 120, 12);
        let text: Vec<String> = (0..12).map(|y| row(&buf, y)).collect();
        let joined = text.join("\n");
        assert!(joined.contains("Ask about sustainable development"));
        assert!(joined.contains("1. What are your views"));
        assert!(joined.contains("4. Tell me about participatory democracy"));
    }

    #[test]
    fn user_messages_align_right_and_replies_left() {
        let mut conversation = Conversation::new();
        let exchange = conversation.begin("Hello").unwrap();
        conversation.complete(exchange, Ok("Welcome.".to_string()));

        let buf = render(conversation.messages(), 40, 10);
        let rows: Vec<String> = (0..10).map(|y| row(&buf, y)).collect();

        let user_row = rows.iter().find(|r| r.contains("Hello")).unwrap();
        assert!(user_row.trim_end().ends_with("Hello"));
        assert!(user_row.starts_with(' '));

        let header = rows.iter().find(|r| r.contains("Larry Agran ·")).unwrap();
        assert!(header.starts_with("Larry Agran"));
        let reply = rows.iter().find(|r| r.contains("Welcome.")).unwrap();
        assert!(reply.starts_with("Welcome."));
    }

    #[test]
    fn newest_lines_stay_visible_when_history_overflows() {
        let mut conversation = Conversation::new();
        for i in 0..10 {
            let exchange = conversation.begin(&format!("question {}", i)).unwrap();
            conversation.complete(exchange, Ok(format!("answer {}", i)));
        }

        let buf = render(conversation.messages(), 40, 4);
        let bottom = row(&buf, 3);
        assert!(bottom.contains("answer 9"));
    }
}
