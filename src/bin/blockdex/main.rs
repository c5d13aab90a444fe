//! Binary entry point for the blockdex CLI.
#![forbid(unsafe_code)]

mod config;

use std::error::Error;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use blockdex::{
    cli::{
        load_extract::{extract_file, load_file, print_pairs, CliError},
        Shell, ShellOptions,
    },
    logging::init_logging,
    primitives::pager::{decode_header, BlockFile, BLOCK_SIZE},
    storage::btree::{decode_node, BTree},
    types::BlockId,
};
use clap::{Parser, Subcommand};
use config::CliConfig;

#[derive(Parser, Debug)]
#[command(
    name = "blockdex",
    version,
    about = "Persistent u64 key/value index backed by an on-disk B-tree",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "BLOCKDEX_CONFIG",
        value_name = "FILE",
        help = "Path to the TOML config file"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        help = "Tracing filter directive (overrides RUST_LOG and the config file)"
    )]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new, empty index file
    Create {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, help = "Replace the file if it already exists")]
        force: bool,
    },
    /// Insert one key/value pair
    Insert {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        key: u64,
        value: u64,
    },
    /// Look up the value stored for a key
    Search {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        key: u64,
    },
    /// Insert every key,value line of a CSV file, skipping bad lines
    Load {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "CSV")]
        input: PathBuf,
    },
    /// Print every pair in ascending key order
    Print {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Write every pair as key,value lines in ascending key order
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "OUT")]
        output: PathBuf,
        #[arg(long, help = "Replace the output file if it already exists")]
        force: bool,
    },
    /// Check every structural invariant of the tree
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Hex dump one block and decode its fields
    Dump {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        block: u64,
    },
    /// Interactive command loop
    Shell {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32, Box<dyn Error>> {
    let cli = Cli::parse();
    let cfg = CliConfig::load(cli.config.clone())?;
    let filter = cli
        .log
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .or_else(|| cfg.log_filter().map(str::to_string))
        .unwrap_or_else(|| "warn".to_string());
    init_logging(&filter)?;
    tracing::debug!(config = ?cfg.path(), filter = %filter, "starting");

    match cli.command {
        Command::Create { file, force } => {
            if file.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    file.display()
                )
                .into());
            }
            BTree::create(&file)?;
            println!("Created {}", file.display());
        }
        Command::Insert { file, key, value } => {
            let mut tree = BTree::open(&file)?;
            tree.insert(key, value)?;
        }
        Command::Search { file, key } => {
            let tree = BTree::open(&file)?;
            match tree.search(key)? {
                Some(value) => println!("{key} {value}"),
                None => {
                    eprintln!("Key not found");
                    return Ok(2);
                }
            }
        }
        Command::Load { file, input } => {
            let mut tree = BTree::open(&file)?;
            let report = load_file(&mut tree, &input)?;
            for issue in &report.issues {
                eprintln!("{issue}");
            }
            println!(
                "Loaded {} pairs ({} duplicates, {} malformed lines skipped)",
                report.inserted, report.duplicates, report.malformed
            );
            tree.stats().emit_tracing();
        }
        Command::Print { file } => {
            let tree = BTree::open(&file)?;
            print_pairs(&tree, io::stdout().lock())?;
        }
        Command::Extract {
            file,
            output,
            force,
        } => {
            let tree = BTree::open(&file)?;
            let written = extract_file(&tree, &output, force)?;
            println!("Extracted {written} pairs to {}", output.display());
        }
        Command::Verify { file } => {
            let tree = BTree::open(&file)?;
            let summary = tree.verify()?;
            println!(
                "ok: height={} nodes={} leaves={} keys={} next_block={}",
                summary.height,
                summary.nodes,
                summary.leaves,
                summary.keys,
                tree.header().next_block
            );
        }
        Command::Dump { file, block } => dump_block(&file, BlockId(block))?,
        Command::Shell { file } => {
            let file = file.or_else(|| cfg.default_path().cloned());
            let stdin = io::stdin();
            let options = ShellOptions {
                confirm_overwrite: cfg.confirm_overwrite(),
                show_menu: stdin.is_terminal(),
            };
            let mut shell = Shell::new(stdin.lock(), io::stdout().lock(), options);
            if let Some(path) = file {
                if let Err(err) = shell.open(&path) {
                    eprintln!("Error: {err}");
                }
            }
            shell.run()?;
        }
    }
    Ok(0)
}

fn dump_block(path: &Path, id: BlockId) -> Result<(), CliError> {
    let store = BlockFile::open(path)?;
    let count = store.block_count()?;
    if id.0 >= count {
        return Err(CliError::Message(format!(
            "block {id} out of range (file has {count} blocks)"
        )));
    }
    let block = store.read_block(id)?;
    println!("block {id} @ offset {}", id.offset(BLOCK_SIZE));
    for (row, chunk) in block.chunks(16).enumerate() {
        let ascii: String = chunk
            .iter()
            .map(|b| if b.is_ascii_graphic() { *b as char } else { '.' })
            .collect();
        println!(
            "{:08x}  {} {}  |{ascii}|",
            id.offset(BLOCK_SIZE) as usize + row * 16,
            hex::encode(&chunk[..8]),
            hex::encode(&chunk[8..]),
        );
    }
    if id.is_none() {
        match decode_header(&block) {
            Ok(header) => println!("header: root={} next_block={}", header.root, header.next_block),
            Err(err) => println!("header: {err}"),
        }
    } else {
        match decode_node(&block) {
            Ok(node) => println!(
                "node: block_id={} parent={} num_keys={} leaf={} keys={:?} children={:?}",
                node.block_id,
                node.parent,
                node.num_keys,
                node.is_leaf(),
                node.live_keys(),
                node.live_children()
            ),
            Err(err) => println!("node: {err}"),
        }
    }
    Ok(())
}
