use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use bank::config::StoreConfig;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use process::{
    DailyJob,
    builder::BuildPolicy,
    run_daily,
    utils::{clean_wordlist, load_wordlist, today},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select, build and publish the daily word
    Generate {
        /// Defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        vocabulary: PathBuf,

        #[arg(long)]
        vectors: PathBuf,

        #[arg(long)]
        history: PathBuf,

        #[arg(long, default_value_t = 0.30)]
        threshold: f32,

        #[arg(long, default_value_t = 999)]
        rank_cap: usize,

        #[arg(long, default_value_t = 0)]
        keep_unranked: usize,

        /// Build and print a summary without recording or publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// Filter a raw word list down to valid answers
    Clean {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = 3)]
        min_len: usize,

        #[arg(long, default_value_t = 12)]
        max_len: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Args::parse().command {
        Command::Generate {
            date,
            vocabulary,
            vectors,
            history,
            threshold,
            rank_cap,
            keep_unranked,
            dry_run,
        } => {
            let job = DailyJob {
                date: date.unwrap_or_else(today),
                vocabulary_path: vocabulary,
                vectors_path: vectors,
                history_path: history,
                policy: BuildPolicy {
                    min_similarity: threshold,
                    rank_cap,
                    keep_unranked,
                },
                dry_run,
            };

            let store = StoreConfig::load()?.build().await?;
            run_daily(&job, store.as_ref()).await?;
        }
        Command::Clean {
            input,
            output,
            min_len,
            max_len,
        } => {
            let words = load_wordlist(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let cleaned = clean_wordlist(&words, min_len, max_len);

            let mut contents = cleaned.join("\n");
            contents.push('\n');
            fs::write(&output, contents)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            info!("Kept {} of {} words", cleaned.len(), words.len());
        }
    }

    Ok(())
}
