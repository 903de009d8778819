//! CLI entry point for `mimetree`.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use humansize::{format_size, BINARY};

use mimetree::config::{self, Config};
use mimetree::model::part::parse_path;
use mimetree::{Body, Message, Part};

#[derive(Parser)]
#[command(
    name = "mimetree",
    version,
    about = "Inspect, decode and re-serialize RFC 5322 / MIME messages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the part structure of a message
    Tree {
        /// Message file, or `-` for stdin
        file: PathBuf,
    },
    /// Print the header fields of one part
    Headers {
        file: PathBuf,
        /// Dotted 1-based part path, e.g. `2.1` (default: the whole message)
        #[arg(short, long, default_value = "")]
        part: String,
        /// For a message/rfc822 part, show the enclosed message's header
        #[arg(long)]
        enclosed: bool,
    },
    /// Dump the parsed tree as JSON
    Json { file: PathBuf },
    /// Write the decoded body of a leaf part to stdout
    Body {
        file: PathBuf,
        /// Dotted 1-based part path
        #[arg(short, long, default_value = "")]
        part: String,
    },
    /// Re-serialize a message to stdout
    Roundtrip {
        file: PathBuf,
        /// Compare with the input instead of printing; fail if they differ
        #[arg(long)]
        check: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    match cli.command {
        Commands::Tree { file } => cmd_tree(&file, &config),
        Commands::Headers {
            file,
            part,
            enclosed,
        } => cmd_headers(&file, &part, enclosed),
        Commands::Json { file } => cmd_json(&file, &config),
        Commands::Body { file, part } => cmd_body(&file, &part),
        Commands::Roundtrip { file, check } => cmd_roundtrip(&file, check),
    }
}

/// Set up tracing on stderr. `RUST_LOG` takes precedence over `level`.
fn setup_logging(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

/// Open `path` for reading; `-` is stdin.
fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    Ok(Box::new(file))
}

fn parse_message(path: &Path) -> anyhow::Result<Message> {
    let input = open_input(path)?;
    let message =
        Message::parse(input).with_context(|| format!("Cannot parse {}", path.display()))?;
    tracing::info!(path = %path.display(), content_type = %message.header.content_type(), "Parsed message");
    Ok(message)
}

fn find_part<'m>(message: &'m Message, path: &str) -> anyhow::Result<&'m Part> {
    let indices =
        parse_path(path).with_context(|| format!("Invalid part path {path:?}"))?;
    message
        .find(&indices)
        .with_context(|| format!("No part at path {path:?}"))
}

fn cmd_tree(path: &Path, config: &Config) -> anyhow::Result<()> {
    let message = parse_message(path)?;
    let mut out = io::stdout().lock();
    print_tree(&mut out, &message, "", 0, config.output.show_sizes)?;
    Ok(())
}

fn print_tree(
    out: &mut dyn Write,
    part: &Part,
    label: &str,
    depth: usize,
    show_sizes: bool,
) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    let label = if label.is_empty() { "." } else { label };
    let content_type = part.header.content_type();
    match &part.body {
        Body::Text(raw) if show_sizes => {
            writeln!(
                out,
                "{indent}{label:<8} {content_type} ({}, {})",
                part.header.transfer_encoding(),
                format_size(raw.len(), BINARY)
            )
        }
        Body::Text(_) => writeln!(out, "{indent}{label:<8} {content_type}"),
        Body::NestedMessage(inner) => {
            writeln!(out, "{indent}{label:<8} {content_type}")?;
            let subject = inner.header.subject();
            if !subject.is_empty() {
                writeln!(out, "{indent}  {:<8} Subject: {subject}", "")?;
            }
            let inner_label = if label == "." { "" } else { label };
            print_tree(out, inner, inner_label, depth + 1, show_sizes)
        }
        Body::DeliveryStatus(ds) => writeln!(
            out,
            "{indent}{label:<8} {content_type} ({} recipient block(s))",
            ds.recipients.len()
        ),
        Body::Multipart(multipart) => {
            writeln!(
                out,
                "{indent}{label:<8} {content_type} ({} part(s))",
                multipart.parts.len()
            )?;
            for (i, child) in multipart.parts.iter().enumerate() {
                let child_label = if label == "." {
                    (i + 1).to_string()
                } else {
                    format!("{label}.{}", i + 1)
                };
                print_tree(out, child, &child_label, depth + 1, show_sizes)?;
            }
            Ok(())
        }
    }
}

fn cmd_headers(path: &Path, part_path: &str, enclosed: bool) -> anyhow::Result<()> {
    let message = parse_message(path)?;
    let mut part = find_part(&message, part_path)?;
    if enclosed {
        match &part.body {
            Body::NestedMessage(inner) => part = &inner.0,
            _ => anyhow::bail!("Part {part_path:?} is not an enclosed message"),
        }
    }
    let mut out = io::stdout().lock();
    for field in &part.header.fields {
        writeln!(out, "{}: {}", field.canonical_name(), field.value())?;
    }
    Ok(())
}

fn cmd_json(path: &Path, config: &Config) -> anyhow::Result<()> {
    let message = parse_message(path)?;
    let json = if config.output.pretty_json {
        serde_json::to_string_pretty(&message)?
    } else {
        serde_json::to_string(&message)?
    };
    println!("{json}");
    Ok(())
}

fn cmd_body(path: &Path, part_path: &str) -> anyhow::Result<()> {
    let message = parse_message(path)?;
    let part = find_part(&message, part_path)?.enclosed();
    let mut body = part.body()?;
    let mut out = io::stdout().lock();
    io::copy(&mut body, &mut out)?;
    out.flush()?;
    Ok(())
}

fn cmd_roundtrip(path: &Path, check: bool) -> anyhow::Result<()> {
    let mut input = Vec::new();
    open_input(path)?.read_to_end(&mut input)?;
    let message = Message::parse_bytes(&input)
        .with_context(|| format!("Cannot parse {}", path.display()))?;
    let output = message.to_bytes()?;

    if !check {
        let mut out = io::stdout().lock();
        out.write_all(&output)?;
        out.flush()?;
        return Ok(());
    }

    if output == input {
        println!("identical ({})", format_size(input.len(), BINARY));
        return Ok(());
    }
    let offset = input
        .iter()
        .zip(&output)
        .position(|(a, b)| a != b)
        .unwrap_or(input.len().min(output.len()));
    anyhow::bail!(
        "Output differs from input at byte {offset} (input {} bytes, output {} bytes)",
        input.len(),
        output.len()
    )
}
