//! Turning decoration ranges into styled text.

use crate::config::StyleSpec;
use crate::projector::DecorationRange;
use crate::segment::Snapshot;
use crate::theme::UiPalette;
use anyhow::{Context, Result};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Tag to style lookup. Tags with no entry render undecorated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleTable {
    styles: HashMap<String, Style>,
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_palette(palette: &UiPalette) -> Self {
        let mut table = Self::new();
        let code = match palette.code_bg {
            Some(bg) => Style::default().bg(bg),
            None => Style::default().fg(palette.accent),
        };
        table.insert(
            "url",
            Style::default()
                .fg(palette.link)
                .add_modifier(Modifier::UNDERLINED),
        );
        table.insert("bold", Style::default().add_modifier(Modifier::BOLD));
        table.insert("code", code);
        table.insert("italic", Style::default().add_modifier(Modifier::ITALIC));
        table.insert(
            "underlined",
            Style::default().add_modifier(Modifier::UNDERLINED),
        );
        table.insert(
            "title",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );
        table.insert(
            "punctuation",
            Style::default().fg(palette.muted).add_modifier(Modifier::DIM),
        );
        table.insert("list", Style::default().fg(palette.accent));
        table.insert(
            "hr",
            Style::default().fg(palette.muted).add_modifier(Modifier::DIM),
        );
        table
    }

    pub fn insert(&mut self, tag: impl Into<String>, style: Style) {
        self.styles.insert(tag.into(), style);
    }

    /// Applies config overrides on top of the current entries.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, StyleSpec>) -> Result<Self> {
        for (tag, spec) in overrides {
            let base = self.styles.get(tag).copied().unwrap_or_default();
            let style = spec_to_style(spec, base)
                .with_context(|| format!("Invalid style for tag `{tag}`"))?;
            self.styles.insert(tag.clone(), style);
        }
        Ok(self)
    }

    pub fn get(&self, tag: &str) -> Option<Style> {
        self.styles.get(tag).copied()
    }

    /// Style for a range: its tag first, then its alias.
    pub fn resolve(&self, range: &DecorationRange) -> Option<Style> {
        let style = self
            .get(&range.tag)
            .or_else(|| range.alias.as_deref().and_then(|alias| self.get(alias)));
        if style.is_none() {
            tracing::trace!(tag = %range.tag, "no style for tag");
        }
        style
    }
}

fn spec_to_style(spec: &StyleSpec, base: Style) -> Result<Style> {
    let mut style = base;
    if let Some(fg) = &spec.fg {
        style = style.fg(parse_color(fg)?);
    }
    if let Some(bg) = &spec.bg {
        style = style.bg(parse_color(bg)?);
    }
    for (flag, modifier) in [
        (spec.bold, Modifier::BOLD),
        (spec.italic, Modifier::ITALIC),
        (spec.underline, Modifier::UNDERLINED),
        (spec.dim, Modifier::DIM),
    ] {
        style = match flag {
            Some(true) => style.add_modifier(modifier),
            Some(false) => style.remove_modifier(modifier),
            None => style,
        };
    }
    Ok(style)
}

fn parse_color(value: &str) -> Result<Color> {
    Color::from_str(value).map_err(|_| anyhow::anyhow!("Unknown color `{value}`"))
}

/// Renders the snapshot as styled lines.
///
/// Each segment's text is split into spans at range boundaries; spans never
/// merge across segments. Where ranges overlap, later ranges patch earlier
/// ones. A newline inside segment text starts a new line.
pub fn apply(
    snapshot: &Snapshot,
    ranges: &[DecorationRange],
    table: &StyleTable,
    base: Style,
) -> Vec<Line<'static>> {
    let segments = snapshot.segments();
    let mut starts = Vec::with_capacity(segments.len());
    let mut total = 0;
    for segment in segments {
        starts.push(total);
        total += segment.len();
    }
    let offsets = snapshot.offsets();

    let mut styles = vec![base; total];
    for range in ranges {
        let Some(style) = table.resolve(range) else {
            continue;
        };
        let (Some(&anchor), Some(&focus)) = (
            offsets.get(&range.anchor_key),
            offsets.get(&range.focus_key),
        ) else {
            tracing::warn!(tag = %range.tag, "range refers to an unknown segment");
            continue;
        };
        let from = (anchor + range.anchor_offset).min(total);
        let to = (focus + range.focus_offset).min(total);
        for slot in styles.iter_mut().take(to).skip(from) {
            *slot = slot.patch(style);
        }
    }

    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    for (segment, &start) in segments.iter().zip(&starts) {
        let mut run = String::new();
        let mut run_style = base;
        for (i, ch) in segment.text.chars().enumerate() {
            let style = styles[start + i];
            if ch == '\n' {
                flush_run(&mut spans, &mut run, run_style);
                lines.push(Line::from(std::mem::take(&mut spans)));
                continue;
            }
            if style != run_style {
                flush_run(&mut spans, &mut run, run_style);
                run_style = style;
            }
            run.push(ch);
        }
        flush_run(&mut spans, &mut run, run_style);
    }
    if !spans.is_empty() {
        lines.push(Line::from(spans));
    }
    lines
}

fn flush_run(spans: &mut Vec<Span<'static>>, run: &mut String, style: Style) {
    if !run.is_empty() {
        spans.push(Span::styled(std::mem::take(run), style));
    }
}
