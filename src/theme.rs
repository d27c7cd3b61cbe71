use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::persist::KvStore;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub muted: Color,
    pub accent: Color,
    pub highlight_bg: Color,
    pub first: Color,
    pub second: Color,
    pub error: Color,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                fg: Color::Black,
                bg: Color::White,
                muted: Color::Gray,
                accent: Color::Blue,
                highlight_bg: Color::LightBlue,
                first: Color::Indexed(62),
                second: Color::Red,
                error: Color::Red,
            },
            Theme::Dark => Palette {
                fg: Color::White,
                bg: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                highlight_bg: Color::DarkGray,
                first: Color::LightBlue,
                second: Color::LightRed,
                error: Color::LightRed,
            },
        }
    }

    pub fn load(store: &KvStore) -> Self {
        store.get(THEME_KEY).unwrap_or_default()
    }

    pub fn save(self, store: &KvStore) {
        if let Err(err) = store.set(THEME_KEY, &self) {
            warn!("failed to persist theme: {err:#}");
        }
    }
}
