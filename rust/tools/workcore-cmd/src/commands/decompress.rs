//! Decompress command implementation

use anyhow::{Context, Result};
use workcore_chunks::decompress_file;

use crate::{commands::apply_pool_flags, config::CmdConfig, utils};

/// Run the decompress command
pub fn run(
    threads: Option<usize>,
    pooled: bool,
    config_path: Option<String>,
    input: String,
    output: String,
) -> Result<()> {
    utils::validate_file_exists(&input)?;
    let mut options = CmdConfig::load(config_path.as_deref())?.compress;
    apply_pool_flags(&mut options, threads, pooled);

    let written = decompress_file(&input, &output, &options)
        .with_context(|| format!("Failed to decompress {input}"))?;

    println!(
        "Decompressed {input} -> {output} ({})",
        utils::format_size(written)
    );
    Ok(())
}
