use crossterm::event::{Event, KeyEvent, KeyEventKind};

/// TUI-specific events the chat view reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    /// Key press event
    Key(KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),
}

impl TuiEvent {
    /// Convert a raw terminal event. Key releases and repeats, mouse and
    /// focus events are dropped.
    pub fn from_crossterm(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(TuiEvent::Key(key)),
            Event::Paste(text) => Some(TuiEvent::Paste(text)),
            Event::Resize(width, height) => Some(TuiEvent::Resize(width, height)),
            _ => None,
        }
    }
}
