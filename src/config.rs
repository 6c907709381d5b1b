//! Configuration module.
//!
//! This module defines the command-line interface (CLI) for the transcoder
//! using `clap`, plus the cross-flag validation that must hold before the
//! core runs: the metadata flags only make sense for the NRO format.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::aset::Metadata;
use crate::error::ConvertError;

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Relocatable homebrew executable, uncompressed, optional metadata.
    Nro,
    /// Software object, per-segment LZ4 compression and SHA-256 checksums.
    Nso,
}

/// Convert a statically-linked AArch64 ELF executable into an NRO or NSO
/// container.
///
/// The input must already have final virtual addresses baked in; this tool
/// repackages its four loadable segments and performs no linking or
/// relocation.
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
pub struct Config {
    /// Input ELF file
    pub input: PathBuf,

    /// Output NRO/NSO file
    pub output: PathBuf,

    /// Output file format
    #[arg(value_enum)]
    pub format: OutputFormat,

    /// Application name (requires `nro` format)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Application developer (requires `nro` format)
    #[arg(short, long)]
    pub developer: Option<String>,

    /// Application version (requires `nro` format)
    #[arg(short = 'v', long)]
    pub version: Option<String>,

    /// Path to application icon (256x256 JPEG, passed through unvalidated;
    /// requires `nro` format)
    #[arg(short, long)]
    pub icon: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}

impl Config {
    /// Reject flag combinations the core must never see. A violation here
    /// is a usage error, not a transcoding failure.
    pub fn validate(&self) -> Result<()> {
        let has_metadata = self.name.is_some()
            || self.developer.is_some()
            || self.version.is_some()
            || self.icon.is_some();
        if has_metadata && self.format != OutputFormat::Nro {
            bail!("--name, --developer, --version, and --icon require `nro` format");
        }
        Ok(())
    }

    /// Load the user-supplied metadata, reading the icon file if one was
    /// given. `None` when no metadata flag was supplied at all.
    pub fn metadata(&self) -> Result<Option<Metadata>> {
        if self.name.is_none()
            && self.developer.is_none()
            && self.version.is_none()
            && self.icon.is_none()
        {
            return Ok(None);
        }

        let icon = match &self.icon {
            Some(path) => Some(std::fs::read(path).map_err(|source| {
                ConvertError::ResourceUnavailable {
                    path: path.clone(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(Some(Metadata {
            name: self.name.clone().unwrap_or_default(),
            developer: self.developer.clone().unwrap_or_default(),
            version: self.version.clone().unwrap_or_default(),
            icon,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(format: OutputFormat) -> Config {
        Config {
            input: "in.elf".into(),
            output: "out.bin".into(),
            format,
            name: None,
            developer: None,
            version: None,
            icon: None,
            log_level: "info".into(),
        }
    }

    #[test]
    fn metadata_flags_are_rejected_for_nso() {
        let mut cfg = config(OutputFormat::Nso);
        cfg.name = Some("App".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn metadata_flags_are_accepted_for_nro() {
        let mut cfg = config(OutputFormat::Nro);
        cfg.name = Some("App".into());
        cfg.icon = None;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn no_metadata_flags_yields_none() {
        assert!(config(OutputFormat::Nro).metadata().unwrap().is_none());
    }

    #[test]
    fn missing_icon_file_is_resource_unavailable() {
        let mut cfg = config(OutputFormat::Nro);
        cfg.icon = Some("/nonexistent/icon.jpg".into());
        let err = cfg.metadata().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::ResourceUnavailable { .. })
        ));
    }
}
