mod counter;
mod extract;
mod partition;
mod protocol;
mod report;
mod run;
mod shared_types;

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use log::info;

use report::LanguageTable;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Path to the tweet corpus file.
    corpus: PathBuf,

    /// Number of ranks counting in parallel.
    #[arg(short, long, default_value = "1")]
    ranks: u32,

    /// Language code to display name table.
    #[arg(short, long, default_value = "data/languages.json")]
    languages: PathBuf,

    /// Entries shown in each ranked list.
    #[arg(short, long, default_value = "10")]
    top: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = CliArgs::parse();
    if args.ranks == 0 {
        return Err("at least one rank is required".into());
    }

    let started = Instant::now();
    info!(
        "counting over {} with {} ranks",
        args.corpus.display(),
        args.ranks
    );

    let merged = run::execute(&args.corpus, args.ranks).await?;

    let languages = LanguageTable::load(&args.languages)?;
    for line in report::render_report(&merged, &languages, args.top)? {
        info!("{line}");
    }

    info!("finished in {:.2?}", started.elapsed());
    Ok(())
}
