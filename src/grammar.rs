//! Declarative highlighting grammars.
//!
//! A grammar is an ordered list of rules; each rule names the token kind it
//! produces and one or more regex patterns. Grammars live in a [`GrammarSet`]
//! and refer to each other by name through `inside`, which is how nested
//! tokens (the `**` punctuation inside a bold span, say) are described.
//! Grammars are plain data loaded from TOML and know nothing about segments
//! or projection.

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::Path;

const MARKDOWN_SOURCE: &str = include_str!("grammars/markdown.toml");

static MARKDOWN: Lazy<GrammarSet> = Lazy::new(|| {
    GrammarSet::from_toml(MARKDOWN_SOURCE).expect("built-in markdown grammar is valid")
});

#[derive(Debug, Clone)]
pub struct Pattern {
    pub regex: Regex,
    pub lookbehind: bool,
    pub inside: Option<String>,
}

impl Pattern {
    /// Byte range of the first non-empty match in `text`.
    ///
    /// With `lookbehind`, everything up to the end of capture group 1 is part
    /// of the match but not of the returned range. When group 1 did not take
    /// part in the match, the whole match is returned.
    pub fn find(&self, text: &str) -> Option<Range<usize>> {
        if !self.lookbehind {
            return self
                .regex
                .find_iter(text)
                .find(|m| !m.is_empty())
                .map(|m| m.range());
        }
        self.regex.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            let start = caps.get(1).map_or(whole.start(), |m| m.end());
            (start < whole.end()).then_some(start..whole.end())
        })
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: String,
    pub alias: Option<String>,
    pub patterns: Vec<Pattern>,
}

#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub rules: Vec<Rule>,
}

/// Named grammars plus the one tokenization starts from.
#[derive(Debug, Clone)]
pub struct GrammarSet {
    root: String,
    grammars: BTreeMap<String, Grammar>,
}

#[derive(Debug, Deserialize)]
struct RawGrammarSet {
    root: String,
    #[serde(default)]
    grammar: BTreeMap<String, Vec<RawRule>>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    kind: String,
    alias: Option<String>,
    patterns: Vec<RawPattern>,
}

#[derive(Debug, Deserialize)]
struct RawPattern {
    regex: String,
    #[serde(default)]
    lookbehind: bool,
    inside: Option<String>,
}

impl GrammarSet {
    /// The built-in markdown rule table.
    pub fn markdown() -> Self {
        MARKDOWN.clone()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Failed to load grammar {}", path.display()))
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let raw: RawGrammarSet = toml::from_str(source).context("Failed to parse grammar")?;

        let mut grammars = BTreeMap::new();
        for (name, raw_rules) in raw.grammar {
            let mut rules = Vec::with_capacity(raw_rules.len());
            for raw_rule in raw_rules {
                if raw_rule.patterns.is_empty() {
                    bail!("rule `{}` in grammar `{name}` has no patterns", raw_rule.kind);
                }
                let mut patterns = Vec::with_capacity(raw_rule.patterns.len());
                for (idx, raw_pattern) in raw_rule.patterns.into_iter().enumerate() {
                    let regex = Regex::new(&raw_pattern.regex).with_context(|| {
                        format!(
                            "Invalid regex in grammar `{name}`, rule `{}`, pattern {}",
                            raw_rule.kind,
                            idx + 1
                        )
                    })?;
                    if raw_pattern.lookbehind && regex.captures_len() < 2 {
                        bail!(
                            "rule `{}` in grammar `{name}` uses lookbehind without a capture group",
                            raw_rule.kind
                        );
                    }
                    patterns.push(Pattern {
                        regex,
                        lookbehind: raw_pattern.lookbehind,
                        inside: raw_pattern.inside,
                    });
                }
                rules.push(Rule {
                    kind: raw_rule.kind,
                    alias: raw_rule.alias,
                    patterns,
                });
            }
            grammars.insert(name, Grammar { rules });
        }

        let set = Self {
            root: raw.root,
            grammars,
        };
        set.check_references()?;
        Ok(set)
    }

    fn check_references(&self) -> Result<()> {
        if !self.grammars.contains_key(&self.root) {
            return Err(anyhow!("root grammar `{}` is not defined", self.root));
        }
        for (name, grammar) in &self.grammars {
            for rule in &grammar.rules {
                for pattern in &rule.patterns {
                    if let Some(inside) = &pattern.inside {
                        if !self.grammars.contains_key(inside) {
                            bail!(
                                "rule `{}` in grammar `{name}` refers to unknown grammar `{inside}`",
                                rule.kind
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn root_name(&self) -> &str {
        &self.root
    }

    pub fn root(&self) -> &Grammar {
        // check_references guarantees the root exists
        &self.grammars[&self.root]
    }

    pub fn get(&self, name: &str) -> Option<&Grammar> {
        self.grammars.get(name)
    }
}
