use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

mod commands;
mod config;
mod utils;

#[derive(Parser)]
#[command(name = "workcore")]
#[command(about = "Parallel chunk processing and task pool utilities")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file as independently compressed chunks
    Compress {
        /// Chunk size in bytes
        #[arg(long)]
        chunk_size: Option<usize>,

        /// zstd compression level
        #[arg(short, long)]
        level: Option<i32>,

        /// Number of pool workers (implies --pooled)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Run chunks on a fixed worker pool instead of one thread per chunk
        #[arg(long)]
        pooled: bool,

        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<String>,

        /// File to compress
        input: String,

        /// Output file
        output: String,
    },

    /// Restore a file produced by `compress`
    Decompress {
        /// Number of pool workers (implies --pooled)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Decode frames on a fixed worker pool instead of one thread per frame
        #[arg(long)]
        pooled: bool,

        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<String>,

        /// Compressed file
        input: String,

        /// Output file
        output: String,
    },

    /// Run a batch of demo tasks on a worker pool
    RunTasks {
        /// Number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Number of tasks to submit
        #[arg(short = 'n', long, default_value_t = 4)]
        tasks: usize,

        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compress {
            chunk_size,
            level,
            threads,
            pooled,
            config,
            input,
            output,
        } => commands::compress::run(
            commands::compress::Overrides {
                chunk_size,
                level,
                threads,
                pooled,
            },
            config,
            input,
            output,
        ),
        Commands::Decompress {
            threads,
            pooled,
            config,
            input,
            output,
        } => commands::decompress::run(threads, pooled, config, input, output),
        Commands::RunTasks {
            workers,
            tasks,
            config,
        } => commands::run_tasks::run(workers, tasks, config),
    }
}
