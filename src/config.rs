use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_dir: Option<PathBuf>,
    /// Width of CLI segments in characters; 0 keeps whole lines.
    pub chunk: usize,
    /// Grammar file replacing the built-in markdown rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<PathBuf>,
    pub log_filter: String,
    pub styles: BTreeMap<String, StyleSpec>,
}

/// Style override for one decoration tag. Unset fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            theme_dir: crate::theme::default_theme_dir(),
            chunk: 0,
            grammar: None,
            log_filter: "warn".to_string(),
            styles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PartialConfig {
    theme: Option<String>,
    theme_dir: Option<PathBuf>,
    chunk: Option<usize>,
    grammar: Option<PathBuf>,
    log_filter: Option<String>,
    styles: Option<BTreeMap<String, StyleSpec>>,
}

impl PartialConfig {
    fn apply_defaults(self) -> (Config, bool) {
        let defaults = Config::default();
        let mut changed = false;

        let theme = match self.theme {
            Some(v) => v,
            None => {
                changed = true;
                defaults.theme
            }
        };
        let theme_dir = match self.theme_dir {
            Some(v) => Some(v),
            None => {
                changed |= defaults.theme_dir.is_some();
                defaults.theme_dir
            }
        };
        let chunk = match self.chunk {
            Some(v) => v,
            None => {
                changed = true;
                defaults.chunk
            }
        };
        let log_filter = match self.log_filter {
            Some(v) => v,
            None => {
                changed = true;
                defaults.log_filter
            }
        };
        let styles = match self.styles {
            Some(v) => v,
            None => {
                changed = true;
                defaults.styles
            }
        };

        (
            Config {
                theme,
                theme_dir,
                chunk,
                // no default to fill in; absence means the built-in grammar
                grammar: self.grammar,
                log_filter,
                styles,
            },
            changed,
        )
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("markspan").join("config.toml"))
}

pub fn ensure_config_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// The `log_filter` set at `path`, read without validating the rest of the
/// file so the logger can be installed before the config is loaded.
pub fn log_filter_at(path: &Path) -> String {
    fs::read_to_string(path)
        .ok()
        .and_then(|raw| raw.parse::<toml::Table>().ok())
        .and_then(|table| table.get("log_filter")?.as_str().map(str::to_string))
        .unwrap_or_else(|| Config::default().log_filter)
}

/// Loads the config at `path`, creating it or filling in missing keys on disk.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        write_config_to(path, &cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let partial: PartialConfig = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let (cfg, changed) = partial.apply_defaults();
    if changed {
        tracing::debug!(path = %path.display(), "filling missing config keys");
        write_config_to(path, &cfg)?;
    }
    Ok(cfg)
}

pub fn write_config_to(path: &Path, cfg: &Config) -> Result<()> {
    ensure_config_dir(path)?;
    let text = toml::to_string_pretty(cfg).context("Failed to serialize config")?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn open_config_in_editor() -> Result<()> {
    let editor = env::var("EDITOR").unwrap_or_else(|_| "nvim".to_string());
    edit_config_at(&config_path()?, &editor)
}

/// Opens `path` in `editor`, creating a default file first if needed. The
/// existing contents are not parsed, so a broken config can still be fixed.
pub fn edit_config_at(path: &Path, editor: &str) -> Result<()> {
    if !path.exists() {
        write_config_to(path, &Config::default())?;
    }

    let mut parts = match shell_words::split(editor) {
        Ok(p) if !p.is_empty() => p,
        _ => vec![editor.to_string()],
    };
    let cmd = parts.remove(0);
    let status = Command::new(cmd)
        .args(parts)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to launch editor for {}", path.display()))?;
    if !status.success() {
        anyhow::bail!("Editor exited with status {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{edit_config_at, load_config_from, log_filter_at, write_config_to, Config, StyleSpec};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_config(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir()
            .join(format!("markspan-test-{name}-{}-{nanos}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = temp_config("missing");
        let cfg = load_config_from(&path).expect("loads");
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn partial_file_is_completed_and_rewritten() {
        let path = temp_config("partial");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(
            &path,
            "theme = \"InspiredGitHub\"\n\n[styles.bold]\nfg = \"red\"\n",
        )
        .expect("write");

        let cfg = load_config_from(&path).expect("loads");
        assert_eq!(cfg.theme, "InspiredGitHub");
        assert_eq!(cfg.chunk, 0);
        assert_eq!(cfg.log_filter, "warn");
        assert_eq!(
            cfg.styles.get("bold"),
            Some(&StyleSpec {
                fg: Some("red".to_string()),
                ..StyleSpec::default()
            })
        );

        let rewritten = fs::read_to_string(&path).expect("read");
        assert!(rewritten.contains("log_filter"));
        assert_eq!(load_config_from(&path).expect("reloads"), cfg);
    }

    #[test]
    fn grammar_path_round_trips() {
        let path = temp_config("grammar");
        let cfg = Config {
            grammar: Some(PathBuf::from("/tmp/grammar.toml")),
            chunk: 3,
            ..Config::default()
        };
        write_config_to(&path, &cfg).expect("writes");
        assert_eq!(load_config_from(&path).expect("loads"), cfg);
    }

    #[test]
    fn malformed_file_reports_path() {
        let path = temp_config("malformed");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "chunk = \"wide\"\n").expect("write");
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn log_filter_is_read_from_otherwise_invalid_config() {
        let path = temp_config("filter");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "log_filter = \"debug\"\nchunk = \"wide\"\n").expect("write");
        assert_eq!(log_filter_at(&path), "debug");
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn log_filter_defaults_when_unreadable() {
        let path = temp_config("filter-missing");
        assert_eq!(log_filter_at(&path), "warn");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "log_filter = [\n").expect("write");
        assert_eq!(log_filter_at(&path), "warn");
    }

    #[cfg(unix)]
    #[test]
    fn malformed_config_can_still_be_edited() {
        let path = temp_config("edit-malformed");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "chunk = \"wide\"\n").expect("write");
        edit_config_at(&path, "true").expect("editor runs");
        assert_eq!(fs::read_to_string(&path).expect("read"), "chunk = \"wide\"\n");
    }

    #[cfg(unix)]
    #[test]
    fn editing_creates_missing_config() {
        let path = temp_config("edit-missing");
        edit_config_at(&path, "true").expect("editor runs");
        assert_eq!(load_config_from(&path).expect("loads"), Config::default());
    }
}
