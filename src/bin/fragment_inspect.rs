use anyhow::Result;
use clap::Parser;

use poliscore_browse::fragment::{self, Dialect};
use poliscore_browse::query::QueryState;

#[derive(Parser, Debug)]
struct Args {
    /// Fragment to decode, with or without the leading '#'
    fragment: String,

    /// Re-encode using detail-page keys (`sort`/`ascending`)
    #[arg(long)]
    detail: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let decoded = fragment::decode(&args.fragment);
    println!("Decoded:");
    println!("  sort_index: {:?}", decoded.sort_index);
    println!("  sort_key:   {:?}", decoded.sort_key);
    println!("  ascending:  {:?}", decoded.ascending);
    println!("  location:   {:?}", decoded.location);

    let state = decoded.apply_to(&QueryState::default())?;
    let dialect = if args.detail { Dialect::Detail } else { Dialect::Listing };
    println!(
        "Canonical: {}",
        fragment::encode(&state, decoded.location.as_deref(), dialect)
    );
    Ok(())
}
