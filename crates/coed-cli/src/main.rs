//! Command-line front end for coed documents.
//!
//! Documents are JSON arrays of DOM nodes: a string is a text node, an
//! object `{tag, attrs?, children?}` is an element.
//!
//! Usage:
//!   coed-cli blocks `<doc.json>` `<pos>`          - block-parent chain at a position
//!   coed-cli paste `<doc.json>` `<pos>` `<text>`  - paste text, resolve links, print HTML
//!   coed-cli html `<doc.json>`                  - print the document as HTML

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coed_config::Config;
use coed_engine::editing::BlockParent;
use coed_engine::model::DomFragment;
use coed_engine::{BlockCodec, Coordinate, Editor, EditorOptions, LinkResolver, Node, ResolverChain};
use regex::Regex;

#[derive(Parser)]
#[command(name = "coed-cli", version, about = "Inspect and edit coed documents")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the blocks enclosing a position, outermost first
    Blocks {
        doc: PathBuf,
        pos: usize,
    },

    /// Paste text at a position, resolve any links in it and print the result
    Paste {
        doc: PathBuf,
        pos: usize,
        text: String,
    },

    /// Print the document as HTML
    Html {
        doc: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?
            .with_context(|| format!("config file {} not found", path.display()))?,
        None => Config::load()?.unwrap_or_default(),
    };

    let mut logger = env_logger::Builder::from_default_env();
    logger.filter_level(log::LevelFilter::Info);
    if let Some(level) = &config.log_level {
        match level.parse::<log::LevelFilter>() {
            Ok(level) => {
                logger.filter_level(level);
            }
            Err(_) => eprintln!("Ignoring unknown log level '{level}' in config"),
        }
    }
    logger.init();

    let options = editor_options(&config)?;
    match cli.command {
        Command::Blocks { doc, pos } => {
            let editor = open(&config, &doc, options)?;
            let chain = editor.block_parents(&Coordinate::Pos(pos))?;
            if chain.is_empty() {
                println!("no block at {pos}");
            }
            for (depth, parent) in chain.iter().enumerate() {
                println!("{}{}", "  ".repeat(depth), describe(parent));
            }
        }
        Command::Paste { doc, pos, text } => {
            let mut editor = open(&config, &doc, options)?;
            editor.paste_text(&text, pos)?;
            for outcome in editor.process_resolutions() {
                log::info!("{outcome:?}");
            }
            println!("{}", editor.to_html());
        }
        Command::Html { doc } => {
            let editor = open(&config, &doc, options)?;
            println!("{}", editor.to_html());
        }
    }
    Ok(())
}

fn editor_options(config: &Config) -> Result<EditorOptions> {
    let mut options = EditorOptions {
        marker_prefix: config.marker_prefix.clone(),
        ..EditorOptions::default()
    };
    if let Some(pattern) = &config.url_pattern {
        options.url_pattern =
            Regex::new(pattern).with_context(|| format!("invalid url_pattern '{pattern}'"))?;
    }
    Ok(options)
}

fn open(config: &Config, doc: &Path, options: EditorOptions) -> Result<Editor> {
    let codec = BlockCodec::with_defaults();
    let doc = load_document(&codec, &config.document_path(doc))?;
    let chain = ResolverChain::new().with(LinkResolver::default());
    Ok(Editor::new(doc, codec, chain, options))
}

fn load_document(codec: &BlockCodec, path: &Path) -> Result<Node> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document {}", path.display()))?;
    let dom: DomFragment = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of DOM nodes", path.display()))?;
    let fragment = codec.parse_fragment(&dom);
    log::debug!("loaded {} top-level nodes from {}", fragment.child_count(), path.display());
    Ok(Node::doc(fragment.children().to_vec()))
}

fn describe(parent: &BlockParent) -> String {
    let mut line = format!(
        "{} {}..{}",
        parent.kind(),
        parent.root.range.start,
        parent.root.range.end
    );
    if let Some(id) = parent.root.target.attr("id").filter(|id| !id.is_null()) {
        line.push_str(&format!(" id={id}"));
    }
    if let Some(slot) = parent.slot() {
        line.push_str(&format!(" in {slot}"));
    }
    line
}
