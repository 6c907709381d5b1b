//! Entry point for the elf2nxo transcoder.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap` and validate flag combos.
//! 2. Map the input ELF into memory and parse its segment table.
//! 3. Extract and validate the four loadable segments.
//! 4. Assemble the requested container (NRO or NSO) in memory.
//! 5. Write the finished image in one shot.
//!
//! Error handling is done via `anyhow`.

use anyhow::{Context, Result};
use clap::Parser;
use memmap2::Mmap;
use object::{Architecture, Object};
use std::fs::File;
use tracing_subscriber::EnvFilter;

use elf2nxo::config::{Config, OutputFormat};
use elf2nxo::error::ConvertError;
use elf2nxo::segments::LoadImage;
use elf2nxo::{nro, nso};

fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    config.validate()?;
    let metadata = config.metadata()?;

    let file = File::open(&config.input).map_err(|source| ConvertError::ResourceUnavailable {
        path: config.input.clone(),
        source,
    })?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| {
        ConvertError::ResourceUnavailable {
            path: config.input.clone(),
            source,
        }
    })?;

    let obj = object::File::parse(&*mmap)
        .map_err(|e| ConvertError::MalformedInput(format!("failed to parse input ELF: {e}")))?;
    if obj.architecture() != Architecture::Aarch64 {
        tracing::warn!(
            "input architecture is {:?}, expected Aarch64; converting anyway",
            obj.architecture()
        );
    }

    let image = LoadImage::from_object(&obj)
        .with_context(|| format!("unsupported input image {}", config.input.display()))?;

    let bytes = match config.format {
        OutputFormat::Nro => nro::build(&image, metadata.as_ref())?,
        OutputFormat::Nso => nso::build(&image)?,
    };

    std::fs::write(&config.output, &bytes).map_err(|source| {
        ConvertError::ResourceUnavailable {
            path: config.output.clone(),
            source,
        }
    })?;

    println!(
        "Converted {} to {} ({} bytes)",
        config.input.display(),
        config.output.display(),
        bytes.len()
    );
    Ok(())
}
