use crate::config::Config;
use anyhow::{Context, Result};
use ratatui::style::Color;
use std::path::PathBuf;
use syntect::highlighting::{Theme, ThemeSet};

pub struct ThemeManager {
    theme_set: ThemeSet,
    theme_names: Vec<String>,
}

/// Colours picked out of a syntect theme for decoration styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiPalette {
    pub base_fg: Color,
    pub base_bg: Option<Color>,
    pub accent: Color,
    pub link: Color,
    pub muted: Color,
    pub code_bg: Option<Color>,
}

impl Default for UiPalette {
    fn default() -> Self {
        Self {
            base_fg: Color::Gray,
            base_bg: None,
            accent: Color::Cyan,
            link: Color::LightMagenta,
            muted: Color::DarkGray,
            code_bg: None,
        }
    }
}

impl ThemeManager {
    pub fn load(config: &Config) -> Result<Self> {
        let mut theme_set = ThemeSet::load_defaults();

        if let Some(dir) = resolve_theme_dir(config) {
            if dir.exists() {
                let extra = ThemeSet::load_from_folder(&dir)
                    .with_context(|| format!("Failed to load themes from {}", dir.display()))?;
                theme_set.themes.extend(extra.themes);
            }
        }

        let mut theme_names: Vec<String> = theme_set.themes.keys().cloned().collect();
        theme_names.sort();

        Ok(Self {
            theme_set,
            theme_names,
        })
    }

    pub fn theme_names(&self) -> &[String] {
        &self.theme_names
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.theme_set.themes.get(name).or_else(|| {
            tracing::debug!(theme = name, "unknown theme, using fallback");
            self.fallback_theme()
        })
    }

    pub fn ui_palette(&self, name: &str) -> UiPalette {
        self.get(name).map(palette_from_theme).unwrap_or_default()
    }

    pub fn fallback_name(&self) -> &str {
        self.theme_names
            .first()
            .map(|s| s.as_str())
            .unwrap_or("base16-ocean.dark")
    }

    fn fallback_theme(&self) -> Option<&Theme> {
        self.theme_set
            .themes
            .get(self.fallback_name())
            .or_else(|| self.theme_set.themes.values().next())
    }
}

fn resolve_theme_dir(config: &Config) -> Option<PathBuf> {
    if let Some(dir) = &config.theme_dir {
        return Some(dir.clone());
    }
    default_theme_dir()
}

pub fn default_theme_dir() -> Option<PathBuf> {
    let base = dirs::config_dir()?;
    Some(base.join("markspan").join("themes"))
}

fn palette_from_theme(theme: &Theme) -> UiPalette {
    let defaults = UiPalette::default();
    let settings = &theme.settings;
    let base_fg = settings
        .foreground
        .map(to_ratatui)
        .unwrap_or(defaults.base_fg);
    let base_bg = settings.background.map(to_ratatui);
    let accent = settings
        .selection_foreground
        .or(settings.caret)
        .or(settings.foreground)
        .map(to_ratatui)
        .unwrap_or(defaults.accent);
    let link = settings
        .caret
        .map(to_ratatui)
        .unwrap_or(defaults.link);
    let muted = settings
        .gutter_foreground
        .or(settings.foreground)
        .map(to_ratatui)
        .unwrap_or(defaults.muted);
    let code_bg = settings
        .line_highlight
        .or(settings.selection)
        .or(settings.background)
        .map(to_ratatui);

    UiPalette {
        base_fg,
        base_bg,
        accent,
        link,
        muted,
        code_bg,
    }
}

fn to_ratatui(color: syntect::highlighting::Color) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}
