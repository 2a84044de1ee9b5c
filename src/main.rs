use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use paper_meta::config::{find_config_file, load_config, Config, ConfigFile, LogFormat};
use paper_meta::models::{ItemFields, MetadataRecord, PdfHints, ResolveInput};
use paper_meta::sources::{CrossrefResolver, Resolver};
use paper_meta::utils::{similarity, HttpClient};
use paper_meta::MetadataResolver;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paper Meta - Resolve DOIs, URLs, arXiv links and PDFs into bibliographic records
#[derive(Parser, Debug)]
#[command(name = "paper-meta")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve DOIs, URLs, arXiv links and PDFs into bibliographic records", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Contact email sent with requests (overrides the config file)
    #[arg(long, global = true)]
    contact_email: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a DOI, a URL or a PDF into one record
    #[command(alias = "r")]
    Resolve {
        /// DOI, with or without a doi: / doi.org prefix
        #[arg(long)]
        doi: Option<String>,

        /// Landing page, DOI link or arXiv link
        #[arg(long)]
        url: Option<String>,

        /// Local PDF file
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Print the flat item fields instead of the record
        #[arg(long)]
        fields: bool,
    },

    /// Show the hints read from a PDF (no network access)
    Hints {
        /// PDF file
        pdf: PathBuf,

        /// Number of leading pages to sample
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Search the bibliographic index by title
    #[command(alias = "s")]
    Search {
        /// Title to search for
        title: String,

        /// Number of candidates to fetch
        #[arg(long, short)]
        rows: Option<usize>,
    },

    /// Resolve every PDF in a directory
    Batch {
        /// Directory containing PDF files
        dir: PathBuf,
    },

    /// Show the effective configuration or write a template
    Config {
        /// Write a configuration template to this file
        #[arg(long)]
        init: Option<PathBuf>,
    },
}

/// One resolved file of a batch run
#[derive(Debug, Serialize)]
struct BatchItem {
    file: String,
    confidence: f64,
    #[serde(flatten)]
    fields: ItemFields,
}

/// One title-search candidate with its similarity to the query
#[derive(Debug, Serialize)]
struct Candidate {
    similarity: f64,
    #[serde(flatten)]
    record: MetadataRecord,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from environment".to_string(),
    })?;
    if let Some(email) = &cli.contact_email {
        config.http.contact_email = Some(email.clone());
    }

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let format = cli.output.resolve();

    match cli.command {
        Commands::Resolve {
            doi,
            url,
            pdf,
            fields,
        } => {
            let input = ResolveInput {
                doi,
                url,
                pdf_path: pdf,
            };
            let resolver = MetadataResolver::from_config(&config)?;
            let record = resolver.resolve(&input).await?;

            if fields {
                output_fields(&record.item_fields(), format)?;
            } else {
                output_record(&record, format)?;
            }
        }

        Commands::Hints { pdf, max_pages } => {
            let resolver = MetadataResolver::from_config(&config)?
                .with_pdf_max_pages(max_pages.unwrap_or(config.resolution.pdf_max_pages));
            let hints = resolver.hints(&pdf)?;
            output_hints(&hints, format)?;
        }

        Commands::Search { title, rows } => {
            let client = HttpClient::from_config(&config.http)?;
            let crossref = CrossrefResolver::from_config(client, &config);
            let rows = rows.unwrap_or(config.resolution.search_rows);

            let candidates: Vec<Candidate> = crossref
                .search_by_title(&title, rows)
                .await?
                .into_iter()
                .map(|record| Candidate {
                    similarity: similarity(&title, record.title()),
                    record,
                })
                .collect();

            if candidates.is_empty() && !cli.quiet {
                eprintln!("No candidates found for '{}'", title);
            }
            output_candidates(&candidates, format)?;
        }

        Commands::Batch { dir } => {
            let resolver = MetadataResolver::from_config(&config)?;
            let files = pdf_files(&dir)?;
            if files.is_empty() && !cli.quiet {
                eprintln!("No PDF files in {}", dir.display());
            }

            let mut items = Vec::new();
            for file in files {
                match resolver.resolve(&ResolveInput::pdf(&file)).await {
                    Ok(record) => items.push(BatchItem {
                        file: file.display().to_string(),
                        confidence: record.confidence(),
                        fields: record.item_fields(),
                    }),
                    Err(e) => tracing::warn!("Skipping {}: {}", file.display(), e),
                }
            }

            output_batch(&items, format)?;
        }

        Commands::Config { init } => {
            let file = ConfigFile::from(config);
            match init {
                Some(path) => {
                    if path.exists() {
                        anyhow::bail!("{} already exists", path.display());
                    }
                    file.save(&path)?;
                    if !cli.quiet {
                        println!("Wrote configuration template to {}", path.display());
                    }
                }
                None => print!("{}", file.to_toml()?),
            }
        }
    }

    Ok(())
}

/// Log to stderr so that stdout stays machine-readable.
///
/// `RUST_LOG` wins; otherwise `-v`/`-vv`/`--quiet` pick the level, falling
/// back to the configured one.
fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("paper_meta={}", level)),
    );
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// `*.pdf` files of `dir`, sorted by name
fn pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn new_table(header: Vec<&str>) -> comfy_table::Table {
    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(header);
    table
}

fn output_record(record: &MetadataRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        OutputFormat::Plain => {
            println!("{}", record.title());
            if !record.authors().is_empty() {
                println!("  Authors: {}", record.authors().join("; "));
            }
            if let Some(year) = record.year() {
                println!("  Year: {}", year);
            }
            if !record.container().is_empty() {
                println!("  Venue: {}", record.container());
            }
            if !record.doi().is_empty() {
                println!("  DOI: {}", record.doi());
            }
            if !record.url().is_empty() {
                println!("  URL: {}", record.url());
            }
            println!("  Source: {} ({:.2})", record.source(), record.confidence());
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell};
            let mut table = new_table(vec!["Field", "Value"]);
            let year = record.year().map(|y| y.to_string()).unwrap_or_default();
            let confidence = format!("{:.2}", record.confidence());
            let rows = [
                ("Title", record.title().to_string()),
                ("Authors", record.authors().join("; ")),
                ("Year", year),
                ("Venue", record.container().to_string()),
                ("DOI", record.doi().to_string()),
                ("URL", record.url().to_string()),
                ("Abstract", truncate(record.abstract_text(), 300)),
                ("Source", record.source().to_string()),
                ("Confidence", confidence),
            ];
            for (field, value) in rows {
                table.add_row(vec![Cell::new(field).add_attribute(Attribute::Bold), Cell::new(value)]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_fields(fields: &ItemFields, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["Field", "Value"]);
            let rows = [
                ("title", fields.title.clone()),
                ("creators", fields.creators.join("; ")),
                ("year", fields.year.clone()),
                ("venue", fields.venue.clone()),
                ("type", fields.item_type.clone()),
                ("tags", fields.tags.join(", ")),
                ("abstract", truncate(&fields.r#abstract, 300)),
                ("doi", fields.doi.clone()),
                ("url", fields.url.clone()),
            ];
            for (field, value) in rows {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        _ => println!("{}", serde_json::to_string_pretty(fields)?),
    }
    Ok(())
}

fn output_hints(hints: &PdfHints, format: OutputFormat) -> Result<()> {
    let doi = hints.doi.clone().unwrap_or_default();
    let title = hints.title_hint.clone().unwrap_or_default();
    let year = hints.year_hint.map(|y| y.to_string()).unwrap_or_default();

    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            println!("{}", serde_json::to_string_pretty(hints)?);
        }
        OutputFormat::Plain => {
            println!("DOI: {}", doi);
            println!("Title: {}", title);
            println!("Year: {}", year);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["Hint", "Value"]);
            table.add_row(vec!["DOI".to_string(), doi]);
            table.add_row(vec!["Title".to_string(), title]);
            table.add_row(vec!["Year".to_string(), year]);
            table.add_row(vec!["Sample".to_string(), truncate(&hints.sample_text, 200)]);
            println!("{table}");
        }
    }
    Ok(())
}

fn output_candidates(candidates: &[Candidate], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            println!("{}", serde_json::to_string_pretty(candidates)?);
        }
        OutputFormat::Plain => {
            for candidate in candidates {
                println!(
                    "{:.2}  {} ({})",
                    candidate.similarity,
                    candidate.record.title(),
                    candidate.record.doi()
                );
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["Similarity", "Title", "Year", "DOI"]);
            for candidate in candidates {
                table.add_row(vec![
                    format!("{:.2}", candidate.similarity),
                    truncate(candidate.record.title(), 60),
                    candidate.record.year().map(|y| y.to_string()).unwrap_or_default(),
                    candidate.record.doi().to_string(),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_batch(items: &[BatchItem], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
        OutputFormat::Plain => {
            for item in items {
                println!("{}\t{:.2}\t{}\t{}", item.file, item.confidence, item.fields.title, item.fields.doi);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["File", "Title", "Year", "DOI", "Confidence"]);
            for item in items {
                let file = Path::new(&item.file)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| item.file.clone());
                table.add_row(vec![
                    file,
                    truncate(&item.fields.title, 50),
                    item.fields.year.clone(),
                    item.fields.doi.clone(),
                    format!("{:.2}", item.confidence),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
