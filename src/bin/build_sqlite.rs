//! Rebuilds a SQLite `words` database from NDJSON shard files.
//!
//! Reads every `*.ndjson` file in the data directory and upserts each
//! record's word and raw line into a single `words` table, in batches.
//! Prints a `key=value` summary on success; on failure prints `ERROR: ...`
//! to stderr and exits non-zero.

use clap::Parser;
use mdict_pack::{BuildError, Result, build_words_db, resolve_path, shard_files};

#[derive(Parser, Debug)]
#[command(name = "build-sqlite", version)]
#[command(about = "Rebuild the SQLite words database from NDJSON shards")]
struct Cli {
    /// Directory containing NDJSON shard files
    #[arg(long, default_value = "data")]
    data_dir: String,

    /// Output SQLite file path
    #[arg(long, default_value = "db.sqlite")]
    out_db: String,

    /// Rows per upsert batch
    #[arg(long, default_value_t = 1000)]
    batch_size: i64,
}

fn run(cli: Cli) -> Result<()> {
    if cli.batch_size < 1 {
        return Err(BuildError::InvalidBatchSize);
    }
    let data_dir = resolve_path(&cli.data_dir)?;
    let out_db = resolve_path(&cli.out_db)?;

    let files = shard_files(&data_dir)?;
    let (rows_read, rows_in_words) = build_words_db(&files, &out_db, cli.batch_size as usize)?;

    println!("data_dir={}", data_dir.display());
    println!("out_db={}", out_db.display());
    println!("ndjson_files={}", files.len());
    println!("rows_read={rows_read}");
    println!("rows_in_words={rows_in_words}");
    println!("table=words(word, definition)");
    println!("index=idx_words_word(unique)");
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}
