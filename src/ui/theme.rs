use ratatui::style::Color;

use crate::config::{Density, Theme};

/// Colors used by every chat widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub accent: Color,
    pub user: Color,
    pub assistant: Color,
    pub muted: Color,
    pub border: Color,
    pub notice: Color,
    pub selection: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: Color::White,
                text: Color::Black,
                accent: Color::Blue,
                user: Color::Blue,
                assistant: Color::Black,
                muted: Color::DarkGray,
                border: Color::Gray,
                notice: Color::Red,
                selection: Color::LightBlue,
            },
            Theme::Dark => Palette {
                background: Color::Reset,
                text: Color::White,
                accent: Color::Cyan,
                user: Color::LightBlue,
                assistant: Color::Green,
                muted: Color::Gray,
                border: Color::DarkGray,
                notice: Color::Yellow,
                selection: Color::Cyan,
            },
        }
    }
}

/// Vertical layout knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spacing {
    pub header_height: u16,
    /// Blank lines between two messages
    pub message_gap: usize,
}

impl Spacing {
    pub fn for_density(density: Density) -> Self {
        match density {
            Density::Comfortable => Spacing {
                header_height: 4,
                message_gap: 1,
            },
            Density::Compact => Spacing {
                header_height: 2,
                message_gap: 0,
            },
        }
    }
}
