//! Export OpenAPI specification to JSON file
//!
//! Usage:
//!   cargo run --bin export_openapi > openapi.json
//!
//! Or with file output:
//!   cargo run --bin export_openapi -- --output docs/openapi.json

use clap::Parser;
use medipill::gateway::openapi::ApiDoc;
use utoipa::OpenApi;

#[derive(Parser, Debug)]
struct Args {
    /// Write to this file instead of stdout
    #[arg(long)]
    output: Option<std::path::PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let json = ApiDoc::openapi().to_pretty_json()?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &json)?;
            eprintln!("OpenAPI spec exported to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
