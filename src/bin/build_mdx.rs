//! Builds an MDict `.mdx` package from NDJSON shard files.
//!
//! Reads every `*.ndjson` file in the data directory, renders each record
//! to an HTML article, and writes a sorted, zlib-compressed MDX 2.0 file.
//! Prints a `key=value` summary on success; on failure prints `ERROR: ...`
//! to stderr and exits non-zero.

use clap::Parser;
use mdict_pack::{MdxWriter, Result, load_entries, resolve_path, shard_files, sorted_entries};

#[derive(Parser, Debug)]
#[command(name = "build-mdx", version)]
#[command(about = "Build an MDict .mdx package from NDJSON shards")]
struct Cli {
    /// Directory containing NDJSON shard files
    #[arg(long, default_value = "data")]
    data_dir: String,

    /// Output .mdx file path
    #[arg(long, default_value = "open-english-dictionary.mdx")]
    out_mdx: String,

    /// Dictionary title stored in the MDX header
    #[arg(long, default_value = "Open English Dictionary")]
    title: String,

    /// Dictionary description stored in the MDX header
    #[arg(long, default_value = "一个开源的 AI 词典")]
    description: String,
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = resolve_path(&cli.data_dir)?;
    let out_mdx = resolve_path(&cli.out_mdx)?;

    let files = shard_files(&data_dir)?;
    let (entries, overwritten) = load_entries(&files)?;
    let sorted = sorted_entries(entries);

    let writer = MdxWriter::new(&sorted, &cli.title, &cli.description)?;
    writer.write_file(&out_mdx)?;

    println!("data_dir={}", data_dir.display());
    println!("out_mdx={}", out_mdx.display());
    println!("ndjson_files={}", files.len());
    println!("entries={}", sorted.len());
    println!("overwritten_duplicates={overwritten}");
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}
