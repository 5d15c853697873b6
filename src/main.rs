use std::process;
use std::time::Instant;

use partition_trie::{build_tree, format_ipv4, load_partition, parse_ipv4, Error};

/// Print a usage message
fn print_usage() {
    println!("partition-trie - classify IPv4 addresses against a partition file");
    println!("Usage:");
    println!("  partition-trie [OPTIONS] FILE [ADDRESS...]");
    println!();
    println!("Options:");
    println!("  --stats           Print trie statistics after building");
    println!("  --validate        Check trie invariants after building");
    println!("  --help            Show this help message");
    println!();
    println!("FILE holds one interval per line: [a.b.c.d,e.f.g.h] label");
    println!("Addresses are read from standard input when none are given.");
}

struct Options {
    path: String,
    addresses: Vec<String>,
    stats: bool,
    validate: bool,
}

/// Parse command line arguments
fn parse_args() -> Result<Options, String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    if args.is_empty() || args.iter().any(|a| a == "--help") {
        print_usage();
        process::exit(0);
    }

    let mut stats = false;
    let mut validate = false;
    let mut positional = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--stats" => stats = true,
            "--validate" => validate = true,
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {}", flag)),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let path = positional.next().ok_or_else(|| "Missing partition file".to_string())?;
    Ok(Options {
        path,
        addresses: positional.collect(),
        stats,
        validate,
    })
}

fn run(options: Options) -> Result<(), Error> {
    let start = Instant::now();
    let intervals = load_partition(&options.path)?;
    let tree = build_tree(intervals)?;
    eprintln!("Loaded {} intervals in {:?}", tree.len(), start.elapsed());

    if options.validate {
        tree.validate()?;
        eprintln!("Trie invariants hold");
    }
    if options.stats {
        let stats = tree.stats();
        eprintln!("  branches:  {}", stats.branch_count);
        eprintln!("  leaves:    {}", stats.leaf_count);
        eprintln!("  slots:     {} ({} gap fills)", stats.slot_count, stats.gap_fill_count);
        eprintln!("  memory:    {} bytes", stats.memory_usage);
    }

    let classify = |address: &str| match parse_ipv4(address) {
        Some(point) => match tree.get_interval(point) {
            Some(interval) => println!(
                "{} -> [{}, {}] {}",
                format_ipv4(point),
                format_ipv4(interval.start()),
                format_ipv4(interval.end()),
                interval.attachment()
            ),
            None => println!("{} -> not found", format_ipv4(point)),
        },
        None => eprintln!("Invalid address: {}", address),
    };

    if options.addresses.is_empty() {
        for line in std::io::stdin().lines() {
            let line = line?;
            let address = line.trim();
            if !address.is_empty() {
                classify(address);
            }
        }
    } else {
        for address in &options.addresses {
            classify(address.as_str());
        }
    }
    Ok(())
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {}", err);
            print_usage();
            process::exit(1);
        }
    };

    if let Err(err) = run(options) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
