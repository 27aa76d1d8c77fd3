//! soar-prism CLI: translate Soar rules into a PRISM model.

use std::path::PathBuf;

use clap::Parser;
use miette::Result;

use soar_prism::pipeline::{translate_file, write_model};

#[derive(Parser)]
#[command(
    name = "soar-prism",
    version,
    about = "Translate Soar production rules into a PRISM DTMC"
)]
struct Cli {
    /// Flattened Soar production file.
    rules: PathBuf,

    /// Optional JSON configuration.
    config: Option<PathBuf>,

    /// Where to write the model.
    #[arg(long, short, default_value = "output1.pm")]
    output: PathBuf,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let translation = translate_file(&cli.rules, cli.config.as_deref())?;
    print!("{translation}");
    write_model(&translation, &cli.output)?;

    if !translation.diagnostics.is_empty() {
        eprintln!(
            "{} rule(s) or module(s) skipped; see warnings above",
            translation.diagnostics.len()
        );
    }
    Ok(())
}
