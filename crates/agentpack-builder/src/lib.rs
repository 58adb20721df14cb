// ABOUTME: Build-time half of agentpack: turns agent descriptors into a packaged plugin.
// ABOUTME: Specializes the tool template per agent, assembles the staged tree, and runs the packager.

pub mod assembler;
pub mod config;
pub mod layout;
pub mod packager;
pub mod specialize;
pub mod transliterate;

pub use assembler::{ArtifactFailure, AssembleError, AssembledPackage, Assembler};
pub use config::{BuildConfig, ConfigError};
pub use layout::TemplateLayout;
pub use packager::{CommandPackager, Packager, PackagingError};
pub use specialize::{SpecializeError, SpecializedArtifact, specialize};
pub use transliterate::{DeunicodeTransliterator, Transliterator};
