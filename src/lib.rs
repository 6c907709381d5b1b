//! ELF to NRO/NSO transcoder library.
//!
//! This library provides the core components for `elf2nxo`.
//! It is organized into several modules:
//! - `config`: CLI configuration.
//! - `error`: error taxonomy (malformed input vs. I/O vs. internal).
//! - `segments`: loadable-segment extraction and validation.
//! - `nro`: relocatable container assembler.
//! - `aset`: metadata block (icon + NACP) builder.
//! - `nso`: compressed shared-object container assembler.

pub mod aset;
pub mod config;
pub mod error;
pub mod nro;
pub mod nso;
pub mod segments;
pub mod utils;
