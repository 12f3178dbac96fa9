// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! CLI tool for building per-node Bloom filters

use clap::{ArgAction, Parser, Subcommand};
use node_bloom::{Config, Id, Record, RECORD_LEN};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    prelude::*,
    registry::Registry,
};

macro_rules! die {
    ($fmt:literal, $($arg:tt)*) => {{
        eprintln!($fmt, $($arg)*);
        std::process::exit(1);
    }};

    ($msg:literal) => {{
        eprintln!($msg);
        std::process::exit(1);
    }};
}

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

fn init_tracing(quiet: bool, verbose: u8) -> LevelFilter {
    let level_filter = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            // Progress lines are part of the tool's contract, so INFO is
            // the floor rather than WARN.
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // Bridge log crate macros to tracing (for library code that uses log::*)
    tracing_log::LogTracer::init().expect("Failed to set log tracer");

    let registry = Registry::default();

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("NODE_BLOOM_LOG")
        .from_env_lossy();

    let subscriber = registry.with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .compact(),
    );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        die!("INTERNAL ERROR: setting default tracing::subscriber failed");
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing_panic::panic_hook(info);
        prev_hook(info); // daisy-chain to old panic hook
    }));

    level_filter
}

/// CLI tool for building per-node Bloom filters
#[derive(Parser, Debug)]
#[command(name = "node-bloom")]
#[command(about = "Builds per-node Bloom filters from flat (node, piece) record logs")]
#[command(args_conflicts_with_subcommands = true)]
struct ToolArgs {
    /// Suppress all output except for errors. This overrides the -v flag.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Turn on verbose output. Supply -v multiple times to increase verbosity.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the input record log (shorthand for `build <INPUT>`)
    input: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    command: Option<ToolCommand>,
}

#[derive(Subcommand, Debug, Clone)]
enum ToolCommand {
    /// Build one Bloom filter per node from a record log
    Build {
        /// Path to the input record log
        input: PathBuf,

        /// Directory for scratch partitions and emitted filters
        #[arg(short, long, default_value = ".")]
        folder: PathBuf,

        /// Number of worker threads (defaults to hardware parallelism)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Generate a random record log for benchmarking
    Generate {
        /// Number of distinct node identifiers
        nodes: usize,

        /// Number of records
        records: u64,

        /// Output log path
        #[arg(short, long, default_value = ".dat")]
        output: PathBuf,
    },
}

/// Writes a random benchmarking log: each record pairs a node drawn from a
/// fixed random set with a fresh random piece identifier.
///
/// Strands write disjoint pre-sized record ranges through positioned
/// private handles, and every generator is seeded from its strand index,
/// so a given `(nodes, records)` pair always produces the same log.
fn generate(nodes: usize, records: u64, output: &Path) -> std::io::Result<()> {
    if nodes == 0 && records > 0 {
        die!("cannot draw records from zero nodes");
    }

    let mut rng = StdRng::seed_from_u64(0);
    let node_ids: Vec<Id> = (0..nodes).map(|_| Id::from_bytes(rng.random())).collect();

    let file = std::fs::File::create(output)?;
    file.set_len(records * RECORD_LEN as u64)?;
    drop(file);

    let strands = std::thread::available_parallelism()
        .map_or(1, std::num::NonZeroUsize::get) as u64;

    std::thread::scope(|scope| -> std::io::Result<()> {
        let handles: Vec<_> = (0..strands)
            .map(|idx| {
                let node_ids = &node_ids;

                scope.spawn(move || -> std::io::Result<()> {
                    let start = records * idx / strands;
                    let end = records * (idx + 1) / strands;

                    let mut rng = StdRng::seed_from_u64(idx);

                    let mut file = std::fs::OpenOptions::new().write(true).open(output)?;
                    file.seek(SeekFrom::Start(start * RECORD_LEN as u64))?;
                    let mut writer = BufWriter::new(file);

                    for _ in start..end {
                        let record = Record {
                            node_id: node_ids[rng.random_range(0..node_ids.len())],
                            piece_id: Id::from_bytes(rng.random()),
                        };
                        writer.write_all(&record.to_bytes())?;
                    }

                    writer.flush()?;
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("strand panicked")?;
        }

        Ok(())
    })?;

    info!(
        "generated {records} records over {nodes} nodes into {}",
        output.display()
    );

    Ok(())
}

fn main() {
    let args = ToolArgs::parse();
    let level_filter = init_tracing(args.quiet, args.verbose);

    info!(
        "starting {} {}, log level: {level_filter}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let command = match (args.command, args.input) {
        (Some(command), _) => command,
        (None, Some(input)) => ToolCommand::Build {
            input,
            folder: PathBuf::from("."),
            workers: None,
        },
        (None, None) => die!("no input log given; see --help"),
    };

    match command {
        ToolCommand::Build {
            input,
            folder,
            workers,
        } => {
            let mut config = Config::new(input).folder(folder);
            if let Some(workers) = workers {
                config = config.workers(workers);
            }

            if let Err(e) = config.run() {
                die!("Error building filters: {}", e);
            }
        }
        ToolCommand::Generate {
            nodes,
            records,
            output,
        } => {
            if let Err(e) = generate(nodes, records, &output) {
                die!("Error generating log: {}", e);
            }
        }
    }
}
