use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use chat_markdown::{EnvPreferences, Exporter, FlavourRegistry, SelectorConfig, SiteRegistry};

/// Export a saved chat conversation page as Markdown
#[derive(Debug, Parser)]
#[command(name = "chat2md", version, about)]
struct Cli {
    /// HTML file to read, `-` for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Page URL the HTML was captured from
    #[arg(long, env = "CHAT2MD_URL")]
    url: Option<String>,

    /// Markdown flavour (defaults to $CHAT2MD_FLAVOUR, then base)
    #[arg(long)]
    flavour: Option<String>,

    /// Selector configuration overriding the bundled rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Omit the site/URL header
    #[arg(long)]
    no_header: bool,

    /// Print the messages as JSON instead of one document
    #[arg(long)]
    json: bool,

    /// List the known flavours and exit
    #[arg(long)]
    list_flavours: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let flavours = FlavourRegistry::builtin();
        if self.list_flavours {
            for name in flavours.names() {
                println!("{}", name);
            }
            return Ok(());
        }

        let url = self
            .url
            .as_deref()
            .context("a page URL is required (--url or CHAT2MD_URL)")?;
        let html = read_input(&self.input)?;

        let rules = SelectorConfig::load_or_bundled(self.rules.as_deref());
        let exporter = Exporter::new(SiteRegistry::with_rules(rules), flavours)
            .with_preferences(Arc::new(EnvPreferences::new()))
            .with_header(!self.no_header);

        if self.json {
            let flavour = exporter.resolve_flavour(self.flavour.as_deref()).await;
            let messages = exporter.messages(&html, url, &flavour)?;
            println!("{}", serde_json::to_string_pretty(&messages)?);
        } else {
            let markdown = exporter.export(&html, url, self.flavour.as_deref()).await?;
            print!("{}", markdown);
        }
        Ok(())
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .context("failed to read HTML from stdin")?;
        Ok(html)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input))
    }
}

fn init_logging(debug: bool, verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(debug)
        .with_line_number(debug)
        .init();

    debug!("Logging initialized");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.verbose);

    if let Err(e) = cli.run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
