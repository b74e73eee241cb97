use clap::Parser;
use rustua_core::{catalog, EncodingContext, EncodingLimits};
use rustua_tools::{convert, CatalogTypeArg, WireFormatArg};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "uaconvert", about = "Convert a catalog structure between OPC UA encodings")]
struct Args {
    #[arg(long = "type", value_enum)]
    data_type: CatalogTypeArg,
    #[arg(long, value_enum)]
    from: WireFormatArg,
    #[arg(long, value_enum)]
    to: WireFormatArg,
    /// Input file; standard input when omitted.
    #[arg(long)]
    input: Option<PathBuf>,
    /// JSON file with encoding limits.
    #[arg(long)]
    limits: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let limits = match &args.limits {
        Some(path) => serde_json::from_str::<EncodingLimits>(&std::fs::read_to_string(path)?)?,
        None => EncodingLimits::default(),
    };
    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let ctx = EncodingContext::for_registry(Arc::new(catalog::pubsub()?)).with_limits(limits);
    match convert(&ctx, &args.data_type.type_id(), args.from, args.to, &input) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("conversion failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
