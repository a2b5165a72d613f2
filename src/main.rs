use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use markspan::config::{self, Config};
use markspan::decoration::{self, StyleTable};
use markspan::grammar::GrammarSet;
use markspan::theme::ThemeManager;
use markspan::{ansi, decorate, logging, Content, Lexer, Snapshot, Token, Tokenizer};
use ratatui::style::Style;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "markspan",
    version,
    about = "Markdown decoration ranges for segmented text"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decoration ranges of one pass over a file
    Ranges {
        file: PathBuf,
        /// Cut lines into segments of at most N characters
        #[arg(long)]
        chunk: Option<usize>,
        /// Emit JSON instead of one range per line
        #[arg(long)]
        json: bool,
    },
    /// Print the token stream for a file
    Tokens {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print a file with its decorations applied
    Highlight {
        file: PathBuf,
        #[arg(long)]
        chunk: Option<usize>,
    },
    /// Open the config file in $EDITOR (default: nvim)
    Config,
    /// Manage themes
    Themes {
        #[command(subcommand)]
        command: ThemeCommands,
    },
}

#[derive(Subcommand)]
enum ThemeCommands {
    /// List available themes
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = config::config_path()?;
    logging::init(&config::log_filter_at(&path))?;
    run(cli.command, || config::load_config_from(&path))
}

/// Runs one command. `load` is only called by commands that use the config,
/// so `markspan config` still opens a file that fails to parse.
fn run(command: Commands, load: impl FnOnce() -> Result<Config>) -> Result<()> {
    match command {
        Commands::Config => config::open_config_in_editor(),
        Commands::Themes {
            command: ThemeCommands::List,
        } => {
            let cfg = load()?;
            let manager = ThemeManager::load(&cfg)?;
            for name in manager.theme_names() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Ranges { file, chunk, json } => {
            let cfg = load()?;
            let snapshot = read_snapshot(&file, chunk.unwrap_or(cfg.chunk))?;
            let tokenizer = load_tokenizer(&cfg)?;
            let ranges = decorate(&snapshot, &tokenizer)
                .with_context(|| format!("Failed to decorate {}", file.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ranges)?);
            } else {
                for range in &ranges {
                    println!(
                        "{}:{} -> {}:{} {}",
                        range.anchor_key,
                        range.anchor_offset,
                        range.focus_key,
                        range.focus_offset,
                        range.tag
                    );
                }
            }
            Ok(())
        }
        Commands::Tokens { file, json } => {
            let cfg = load()?;
            let text = read_document(&file)?;
            let tokenizer = load_tokenizer(&cfg)?;
            let tokens = tokenizer.tokenize(&text);
            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                print_tokens(&tokens, 0);
            }
            Ok(())
        }
        Commands::Highlight { file, chunk } => {
            let cfg = load()?;
            let snapshot = read_snapshot(&file, chunk.unwrap_or(cfg.chunk))?;
            let tokenizer = load_tokenizer(&cfg)?;
            // A failed pass only loses the styling.
            let ranges = decorate(&snapshot, &tokenizer).unwrap_or_else(|err| {
                eprintln!("markspan: {err}; showing undecorated text");
                Vec::new()
            });

            let manager = ThemeManager::load(&cfg)?;
            let palette = manager.ui_palette(&cfg.theme);
            let table = StyleTable::from_palette(&palette).with_overrides(&cfg.styles)?;
            let base = Style::default().fg(palette.base_fg);
            let lines = decoration::apply(&snapshot, &ranges, &table, base);
            ansi::write_lines(&mut io::stdout().lock(), &lines)?;
            Ok(())
        }
    }
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_snapshot(path: &Path, chunk: usize) -> Result<Snapshot> {
    let text = read_document(path)?;
    Ok(Snapshot::from_lines(&text, chunk))
}

fn load_tokenizer(cfg: &Config) -> Result<Tokenizer> {
    let grammars = match &cfg.grammar {
        Some(path) => GrammarSet::load(path)?,
        None => GrammarSet::markdown(),
    };
    Ok(Tokenizer::new(grammars))
}

fn print_tokens(tokens: &[Token], depth: usize) {
    let indent = "  ".repeat(depth);
    for token in tokens {
        match token {
            Token::Literal(text) => println!("{indent}{text:?}"),
            Token::Typed {
                kind,
                alias,
                content,
            } => {
                let alias = alias
                    .as_deref()
                    .map(|a| format!(" ({a})"))
                    .unwrap_or_default();
                match content {
                    Content::Text(text) => println!("{indent}{kind}{alias} {text:?}"),
                    Content::Nested(children) => {
                        println!("{indent}{kind}{alias}");
                        print_tokens(children, depth + 1);
                    }
                }
            }
        }
    }
}
