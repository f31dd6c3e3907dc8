use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::ui::theme::Palette;

/// "… is typing" line shown while a reply is outstanding
pub struct GeneratingIndicator<'a> {
    name: &'a str,
    tick: u64,
    palette: Palette,
}

impl<'a> GeneratingIndicator<'a> {
    pub fn new(name: &'a str, tick: u64, palette: Palette) -> Self {
        Self {
            name,
            tick,
            palette,
        }
    }

    pub fn text(&self) -> String {
        let dots = (self.tick % 3 + 1) as usize;
        format!("{} is typing{}", self.name, ".".repeat(dots))
    }
}

impl Widget for GeneratingIndicator<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(Span::styled(
            self.text(),
            Style::default()
                .fg(self.palette.muted)
                .add_modifier(Modifier::ITALIC),
        ));
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
