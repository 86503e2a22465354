//! Compress command implementation

use anyhow::{Context, Result};
use workcore_chunks::{CompressOptions, compress_file};

use crate::{commands::apply_pool_flags, config::CmdConfig, utils};

/// Command-line flags that override the `compress` section of the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub chunk_size: Option<usize>,
    pub level: Option<i32>,
    pub threads: Option<usize>,
    pub pooled: bool,
}

impl Overrides {
    fn apply(&self, mut options: CompressOptions) -> CompressOptions {
        if let Some(chunk_size) = self.chunk_size {
            options.chunk_size = chunk_size;
        }
        if let Some(level) = self.level {
            options.level = level;
        }
        apply_pool_flags(&mut options, self.threads, self.pooled);
        options
    }
}

/// Run the compress command
pub fn run(
    overrides: Overrides,
    config_path: Option<String>,
    input: String,
    output: String,
) -> Result<()> {
    utils::validate_file_exists(&input)?;
    let config = CmdConfig::load(config_path.as_deref())?;
    let options = overrides.apply(config.compress);

    let summary = compress_file(&input, &output, &options)
        .with_context(|| format!("Failed to compress {input}"))?;

    println!("Compressed {input} -> {output}");
    println!("  Chunks: {}", summary.chunks);
    println!(
        "  Size: {} -> {}",
        utils::format_size(summary.input_bytes),
        utils::format_size(summary.output_bytes)
    );
    println!(
        "  Ratio: {:.2} ({:.1}% saved)",
        summary.ratio(),
        summary.savings_percent()
    );
    println!("  Time: {:?}", summary.elapsed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let config = CompressOptions {
            chunk_size: 100,
            level: 5,
            ..Default::default()
        };
        let overrides = Overrides {
            level: Some(9),
            ..Default::default()
        };
        let options = overrides.apply(config);
        assert_eq!(options.chunk_size, 100);
        assert_eq!(options.level, 9);
        assert!(!options.pooled);
    }

    #[test]
    fn test_run_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.zst");
        std::fs::write(&input, "hello hello hello hello".repeat(100)).unwrap();

        run(
            Overrides {
                chunk_size: Some(256),
                threads: Some(2),
                ..Default::default()
            },
            None,
            input.to_str().unwrap().to_string(),
            output.to_str().unwrap().to_string(),
        )
        .unwrap();
        assert!(output.exists());
    }
}
