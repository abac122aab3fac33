//! Offline filter for record dumps.
//!
//! Reads records (JSON array, single object, or NDJSON) from a file or stdin,
//! applies the same text and categorical predicates a catalog view uses, and
//! prints the matching records as NDJSON. With `--facet`, prints the option
//! list for each named field instead, taken from every record in the dump.

use anyhow::{Context, Result};
use catalogview::{FilterState, FilterUpdate, derived_list, facet_table, parse_record_stream, split_list};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "catalog-filter", version, about = "Filter or facet a record dump")]
struct Args {
    /// Record dump; reads stdin when omitted or `-`.
    input: Option<PathBuf>,

    /// Field the free-text query is matched against.
    #[arg(long, default_value = "title")]
    text_field: String,

    /// Case-insensitive substring query.
    #[arg(long, default_value = "")]
    query: String,

    /// Categorical filter as field=value; repeatable.
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    filters: Vec<String>,

    /// Comma-separated fields to print facet options for.
    #[arg(long)]
    facet: Option<String>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let input = read_input(args.input.as_ref())?;
    let records = parse_record_stream(&input)?;

    let mut filter = FilterState::new().with(FilterUpdate::query(args.query));
    for pair in &args.filters {
        let update = FilterUpdate::parse_pair(pair)
            .with_context(|| format!("filter must be field=value, got '{pair}'"))?;
        filter.apply(update);
    }

    if let Some(fields) = args.facet {
        let facets = facet_table(&records, &split_list(&fields));
        println!("{}", serde_json::to_string(&facets)?);
        return Ok(());
    }

    for record in derived_list(&records, &args.text_field, &filter) {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}
