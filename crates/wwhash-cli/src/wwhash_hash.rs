//! FNV-1 hash utility
//!
//! Usage: wwhash_hash [options] <INPUT>...
//!
//! Prints the 32-bit FNV-1 hash and the folded 30-bit hash of each name.
//! With --suffix, also prints the state that must precede the suffix to
//! reach that hash. With --hash, inputs are read as hash ids (decimal or
//! 0x hex) instead of names, which is how a prefix state is recovered from
//! a target.
//!
//! Example: wwhash_hash --hash 0xEA28F201 --suffix _loop

use clap::Parser;
use wwhash_search::domain::hash::{fnv1_continue, fnv1_hash, fnv1_inverse, fold30};
use wwhash_search::domain::target::parse_hash_id;
use wwhash_search::error::Result;

/// Hash names or invert hashes
#[derive(Parser, Debug)]
#[command(name = "wwhash_hash", version, long_about = None)]
struct Args {
    /// Names (or hash ids with --hash)
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<String>,

    /// Read inputs as hash ids
    #[arg(long)]
    hash: bool,

    /// Print the state preceding this suffix
    #[arg(long, value_name = "SUFFIX")]
    suffix: Option<String>,

    /// Hash this text after each input (prefix state continuation)
    #[arg(long, value_name = "TEXT", conflicts_with = "suffix")]
    append: Option<String>,
}

fn describe(args: &Args, input: &str) -> Result<String> {
    let h = if args.hash {
        parse_hash_id(input)?
    } else {
        fnv1_hash(input)?
    };

    let mut line = format!(
        "{:<24} 0x{:08X}  {:>10}  hash30=0x{:08X}",
        input,
        h,
        h,
        fold30(h)
    );
    if let Some(suffix) = &args.suffix {
        let state = fnv1_inverse(h, suffix)?;
        line.push_str(&format!("  before {:?}=0x{:08X}", suffix, state));
    }
    if let Some(text) = &args.append {
        let next = fnv1_continue(h, text)?;
        line.push_str(&format!("  +{:?}=0x{:08X}", text, next));
    }
    Ok(line)
}

fn main() {
    let args = Args::parse();

    let mut failed = false;
    for input in &args.inputs {
        match describe(&args, input) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                eprintln!("Error: {}: {}", input, e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}
