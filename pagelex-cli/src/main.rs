//! pagelex CLI
//!
//! Splits an HTML page into text, remark and tag nodes and prints each one
//! with its offsets and line/column position.
//!
//! Set `RUST_LOG=pagelex=debug` (or `trace`) to see what the lexer does.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use pagelex_common::net;
use pagelex_common::url::has_scheme;
use pagelex_common::warning::{clear_warnings, set_warnings_enabled};
use pagelex_html::{LexError, Lexer, Node, NodeKind, Page, Stream};
use serde::Serialize;

/// Dump the lexical nodes of an HTML page
#[derive(Parser, Debug)]
#[command(name = "pagelex")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Lex a local file
    pagelex ./index.html

    # Lex a page over HTTP, following <meta charset>
    pagelex --follow-meta https://example.com

    # Lex inline HTML as JSON Lines
    pagelex --json --html '<p class=x>hi</p>'

    # Force a charset and scan script-like text with quote awareness
    pagelex --charset shift_jis --quotesmart page.html
"#)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to an HTML file, or an http(s):, data: or file: URL
    #[arg(value_name = "FILE|URL")]
    path: Option<String>,

    /// Lex this HTML string instead of a file or URL
    #[arg(long, value_name = "HTML", conflicts_with = "path")]
    html: Option<String>,

    /// Charset to decode with, overriding the Content-Type and the default
    #[arg(short, long, value_name = "NAME")]
    charset: Option<String>,

    /// Don't end text runs on a `<` inside quotes or script comments
    #[arg(short, long)]
    quotesmart: bool,

    /// Switch charset when a <meta> tag declares one
    #[arg(long)]
    follow_meta: bool,

    /// Only `-->` closes a comment; `--!>` does not
    #[arg(long)]
    strict_remarks: bool,

    /// Recognize `<? ... ?>` processing instructions
    #[arg(long)]
    instructions: bool,

    /// Print one JSON object per node
    #[arg(long)]
    json: bool,

    /// Print positions only, not node text
    #[arg(long)]
    positions: bool,

    /// Don't print warnings
    #[arg(long)]
    quiet: bool,
}

/// One node as printed.
#[derive(Debug, Serialize)]
struct NodeRecord {
    #[serde(serialize_with = "serialize_kind")]
    kind: NodeKind,
    start: usize,
    end: usize,
    line: usize,
    column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_kind<S: serde::Serializer>(kind: &NodeKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(kind)
}

/// How many times lexing restarts after a `<meta>` charset switch.
const MAX_RESTARTS: usize = 2;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    set_warnings_enabled(!cli.quiet);

    let mut charset = cli.charset.clone();
    let mut restarts = 0;
    let (records, page) = loop {
        clear_warnings();
        let page = open_page(&cli, charset.as_deref())?;
        match lex(&cli, page) {
            Ok(done) => break done,
            Err(LexError::EncodingChange { to, position, .. }) if restarts < MAX_RESTARTS => {
                log::info!("restarting as {to}: text before offset {position} decodes differently");
                charset = Some(to);
                restarts += 1;
            }
            Err(e) => return Err(e).context("lexing failed"),
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if cli.json {
        for record in &records {
            serde_json::to_writer(&mut out, record)?;
            writeln!(out)?;
        }
    } else {
        print_records(&mut out, &records)?;
        writeln!(
            out,
            "{} nodes, {} characters, {} lines, {}",
            records.len(),
            page.fill_offset(),
            page.index().count() + 1,
            page.encoding()
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Open the page named on the command line.
fn open_page(cli: &Cli, charset: Option<&str>) -> anyhow::Result<Page> {
    if let Some(ref html) = cli.html {
        return Ok(Page::from_text_with_charset(html, charset.unwrap_or("UTF-8")));
    }
    let Some(ref path) = cli.path else {
        anyhow::bail!("expected a file path, URL, or --html");
    };
    if has_scheme(path) {
        let connection = net::open(path)?;
        let Some(charset) = charset else {
            return Ok(Page::from_connection(connection)?);
        };
        let (url, _, body) = connection.into_parts();
        let mut page = Page::from_stream(Stream::new(body), Some(charset))?;
        page.set_url(url);
        return Ok(page);
    }
    let file = File::open(path).with_context(|| format!("cannot open {path}"))?;
    Ok(Page::from_reader(file, charset)?)
}

/// Lex the whole page into printable records.
fn lex(cli: &Cli, page: Page) -> pagelex_html::Result<(Vec<NodeRecord>, Page)> {
    let mut lexer = Lexer::new(page);
    lexer.set_follow_meta_charset(cli.follow_meta);
    lexer.set_strict_remarks(cli.strict_remarks);
    lexer.set_processing_instructions(cli.instructions);

    let mut records = Vec::new();
    while let Some(node) = lexer.next_node_with(cli.quotesmart)? {
        records.push(record(lexer.page(), &node, !cli.positions)?);
    }
    Ok((records, lexer.into_page()))
}

fn record(page: &Page, node: &Node, with_text: bool) -> pagelex_html::Result<NodeRecord> {
    let name = node.as_tag().map(|tag| tag.name(page)).transpose()?;
    let text = if with_text { Some(node.source_text(page)?) } else { None };
    Ok(NodeRecord {
        kind: node.kind(),
        start: node.start(),
        end: node.end(),
        line: page.row(node.start()) + 1,
        column: page.column(node.start()) + 1,
        name,
        text,
    })
}

fn print_records(out: &mut impl Write, records: &[NodeRecord]) -> io::Result<()> {
    for record in records {
        let position = format!("{}:{}", record.line, record.column);
        let range = format!("{}..{}", record.start, record.end);
        write!(out, "{:>8} {:>12} ", position.dimmed(), range.dimmed())?;
        let label = format!("{:<6}", record.kind);
        match record.kind {
            NodeKind::Tag => write!(out, "{}", label.cyan())?,
            NodeKind::Remark => write!(out, "{}", label.green())?,
            NodeKind::Text => write!(out, "{label}")?,
        }
        if let Some(ref text) = record.text {
            write!(out, " {text:?}")?;
        } else if let Some(ref name) = record.name {
            write!(out, " {}", name.bold())?;
        }
        writeln!(out)?;
    }
    Ok(())
}
