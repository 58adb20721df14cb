// ABOUTME: Orchestrates one packaging run: log merge, staging, manifest updates, specialization, packaging.
// ABOUTME: Intermediate failures degrade to a partial package; only packaging itself aborts the run.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use agentpack_core::naming;
use agentpack_core::{AgentDescriptor, AgentVariant, PluginManifest, ProviderManifest, ToolSchema};
use agentpack_store::DescriptorLog;
use thiserror::Error;
use ulid::Ulid;
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::layout::TemplateLayout;
use crate::packager::{Packager, PackagingError};
use crate::specialize::specialize;
use crate::transliterate::{DeunicodeTransliterator, Transliterator};

/// Errors that abort an assemble call.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("packaging failed: {0}")]
    PackagingFailed(#[from] PackagingError),
}

/// An agent whose artifacts could not be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFailure {
    pub index: usize,
    pub agent_id: String,
    pub error: String,
}

/// Output of a successful assemble call.
#[derive(Debug)]
pub struct AssembledPackage {
    pub bytes: Vec<u8>,
    /// Number of agents in the package, history included.
    pub agents: usize,
    pub failures: Vec<ArtifactFailure>,
}

/// Builds plugin packages from agent descriptors. Every directory and package
/// file staged by this assembler is removed when it is dropped.
pub struct Assembler {
    template_dir: PathBuf,
    work_dir: PathBuf,
    descriptor_log: PathBuf,
    plugin_name: String,
    layout: TemplateLayout,
    packager: Box<dyn Packager>,
    transliterator: Box<dyn Transliterator>,
    staged: Vec<PathBuf>,
}

impl Assembler {
    pub fn new(config: &BuildConfig, packager: Box<dyn Packager>) -> Self {
        Self {
            template_dir: config.template_dir.clone(),
            work_dir: config.work_dir(),
            descriptor_log: config.descriptor_log(),
            plugin_name: config.plugin_name.clone(),
            layout: TemplateLayout::default(),
            packager,
            transliterator: Box::new(DeunicodeTransliterator),
            staged: Vec::new(),
        }
    }

    /// Assembler using the configured external packaging command.
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config, Box::new(config.packager()))
    }

    pub fn with_layout(mut self, layout: TemplateLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_transliterator(mut self, transliterator: Box<dyn Transliterator>) -> Self {
        self.transliterator = transliterator;
        self
    }

    /// Package every recorded agent plus `batch` into one plugin.
    pub fn assemble(
        &mut self,
        batch: &[AgentDescriptor],
    ) -> Result<AssembledPackage, AssembleError> {
        let descriptors = match DescriptorLog::merge(&self.descriptor_log, batch) {
            Ok(all) => all,
            Err(e) => {
                tracing::error!(
                    "failed to merge descriptor log {}: {}; packaging this batch only",
                    self.descriptor_log.display(),
                    e
                );
                batch.to_vec()
            }
        };

        let staged = self.work_dir.join(Ulid::new().to_string());
        self.staged.push(staged.clone());

        if let Err(e) = copy_tree(&self.template_dir, &staged) {
            tracing::error!(
                "failed to stage template {} into {}: {}",
                self.template_dir.display(),
                staged.display(),
                e
            );
        }
        if let Err(e) = self.rewrite_plugin_manifest(&staged) {
            tracing::error!("failed to rewrite plugin manifest: {}", e);
        }
        if let Err(e) = self.append_provider_tools(&staged, descriptors.len()) {
            tracing::error!("failed to update provider manifest: {}", e);
        }

        let failures = self.write_artifacts(&staged, &descriptors);
        tracing::info!(
            "staged {} agent(s) in {} ({} failed)",
            descriptors.len(),
            staged.display(),
            failures.len()
        );

        let package_path = self.packager.package(&staged)?;
        self.staged.push(package_path.clone());
        let bytes = fs::read(&package_path).map_err(|source| PackagingError::ReadPackage {
            path: package_path.clone(),
            source,
        })?;

        Ok(AssembledPackage {
            bytes,
            agents: descriptors.len(),
            failures,
        })
    }

    fn rewrite_plugin_manifest(&self, staged: &Path) -> Result<(), StepError> {
        let path = staged.join(&self.layout.plugin_manifest);
        let mut manifest: PluginManifest = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
        manifest.name = self.plugin_name.clone();
        fs::write(&path, serde_yaml::to_string(&manifest)?)?;
        Ok(())
    }

    fn append_provider_tools(&self, staged: &Path, count: usize) -> Result<(), StepError> {
        let source = staged.join(&self.layout.provider_source);
        let mut provider: ProviderManifest = serde_yaml::from_str(&fs::read_to_string(&source)?)?;
        provider.append_tools((0..count).map(naming::schema_path));

        let dist = staged.join(&self.layout.provider_dist);
        if let Some(parent) = dist.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dist, serde_yaml::to_string(&provider)?)?;
        Ok(())
    }

    /// Specialize and write every agent's artifacts, collecting failures.
    fn write_artifacts(
        &self,
        staged: &Path,
        descriptors: &[AgentDescriptor],
    ) -> Vec<ArtifactFailure> {
        let mut failures = Vec::new();
        let template_schema = match read_schema(&staged.join(&self.layout.tool_schema)) {
            Ok(schema) => schema,
            Err(e) => {
                tracing::error!("failed to read template schema: {}", e);
                return descriptors
                    .iter()
                    .enumerate()
                    .map(|(index, d)| failure(index, d, &e))
                    .collect();
            }
        };

        let mut sources: HashMap<AgentVariant, Result<String, String>> = HashMap::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            let variant = descriptor.variant();
            let template_source = sources.entry(variant).or_insert_with(|| {
                let path = staged.join(self.layout.source_for(variant));
                fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))
            });

            let result = match template_source {
                Ok(source) => {
                    self.write_artifact(staged, descriptor, index, &template_schema, source)
                }
                Err(e) => Err(StepError::Template(e.clone())),
            };
            if let Err(e) = result {
                tracing::warn!("skipping agent {} ({}): {}", index, descriptor.id, e);
                failures.push(failure(index, descriptor, &e));
            }
        }
        failures
    }

    fn write_artifact(
        &self,
        staged: &Path,
        descriptor: &AgentDescriptor,
        index: usize,
        template_schema: &ToolSchema,
        template_source: &str,
    ) -> Result<(), StepError> {
        let artifact = specialize(
            descriptor,
            index,
            template_schema,
            template_source,
            self.transliterator.as_ref(),
        )?;

        let schema_path = staged.join(naming::schema_path(index));
        if let Some(parent) = schema_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&schema_path, artifact.schema.to_yaml()?)?;
        fs::write(staged.join(naming::source_path(index)), artifact.source)?;
        tracing::debug!("wrote {} for agent {}", schema_path.display(), descriptor.id);
        Ok(())
    }
}

impl Drop for Assembler {
    fn drop(&mut self) {
        for path in self.staged.drain(..) {
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else if path.exists() {
                fs::remove_file(&path)
            } else {
                Ok(())
            };
            if let Err(e) = result {
                tracing::warn!("failed to clean up {}: {}", path.display(), e);
            }
        }
    }
}

/// Failures inside one swallowed step.
#[derive(Debug, Error)]
enum StepError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Specialize(#[from] crate::specialize::SpecializeError),

    #[error("template source unavailable: {0}")]
    Template(String),
}

fn failure(index: usize, descriptor: &AgentDescriptor, error: &StepError) -> ArtifactFailure {
    ArtifactFailure {
        index,
        agent_id: descriptor.id.clone(),
        error: error.to_string(),
    }
}

fn read_schema(path: &Path) -> Result<ToolSchema, StepError> {
    Ok(ToolSchema::from_yaml(&fs::read_to_string(path)?)?)
}

/// Recursively copy `from` into `to`, creating `to`.
fn copy_tree(from: &Path, to: &Path) -> Result<(), std::io::Error> {
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
