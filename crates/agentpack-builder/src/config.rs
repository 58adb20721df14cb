// ABOUTME: Build-time configuration loaded from environment variables.
// ABOUTME: Locates the template tree, descriptor log, staging area and external packager.

use std::path::PathBuf;

use thiserror::Error;

use crate::packager::CommandPackager;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is set but empty")]
    Empty(&'static str),
}

/// Assembler configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub home: PathBuf,
    pub template_dir: PathBuf,
    pub plugin_name: String,
    pub packager_program: String,
    pub packager_args: Vec<String>,
    pub package_extension: String,
}

impl BuildConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Environment variables:
    /// - AGENTPACK_HOME: data directory, made absolute (default: ~/.agentpack)
    /// - AGENTPACK_TEMPLATE_DIR: template tree to stage (default: ./template)
    /// - AGENTPACK_PLUGIN_NAME: plugin manifest name (default: agentpack-agents)
    /// - AGENTPACK_PACKAGER: packaging program (default: dify-plugin)
    /// - AGENTPACK_PACKAGER_ARGS: whitespace-separated arguments placed before
    ///   the staged directory (default: "plugin package")
    /// - AGENTPACK_PACKAGE_EXT: extension of the produced package (default: difypkg)
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = std::env::var("AGENTPACK_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".agentpack")
            });
        let home = std::path::absolute(&home).unwrap_or(home);

        let template_dir = std::env::var("AGENTPACK_TEMPLATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("template"));

        let plugin_name = non_empty("AGENTPACK_PLUGIN_NAME")?
            .unwrap_or_else(|| "agentpack-agents".to_string());

        let packager_program =
            non_empty("AGENTPACK_PACKAGER")?.unwrap_or_else(|| "dify-plugin".to_string());

        let packager_args = std::env::var("AGENTPACK_PACKAGER_ARGS")
            .unwrap_or_else(|_| "plugin package".to_string())
            .split_whitespace()
            .map(String::from)
            .collect();

        let package_extension =
            non_empty("AGENTPACK_PACKAGE_EXT")?.unwrap_or_else(|| "difypkg".to_string());

        Ok(Self {
            home,
            template_dir,
            plugin_name,
            packager_program,
            packager_args,
            package_extension,
        })
    }

    /// The append-only descriptor log.
    pub fn descriptor_log(&self) -> PathBuf {
        self.home.join("agents.jsonl")
    }

    /// Parent directory for staged package trees and produced packages.
    pub fn work_dir(&self) -> PathBuf {
        self.home.join("work")
    }

    pub fn packager(&self) -> CommandPackager {
        CommandPackager {
            program: self.packager_program.clone(),
            args: self.packager_args.clone(),
            extension: self.package_extension.clone(),
            output_dir: self.work_dir(),
        }
    }
}

/// Read an optional variable, rejecting the empty string.
fn non_empty(name: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::Empty(name)),
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all tests that read/write env vars to prevent race conditions.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "AGENTPACK_HOME",
        "AGENTPACK_TEMPLATE_DIR",
        "AGENTPACK_PLUGIN_NAME",
        "AGENTPACK_PACKAGER",
        "AGENTPACK_PACKAGER_ARGS",
        "AGENTPACK_PACKAGE_EXT",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: test-only code, serialized by ENV_MUTEX
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn config_loads_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = BuildConfig::from_env().unwrap();

        assert!(config.home.to_string_lossy().contains(".agentpack"));
        assert_eq!(config.template_dir, PathBuf::from("template"));
        assert_eq!(config.plugin_name, "agentpack-agents");
        assert_eq!(config.packager_program, "dify-plugin");
        assert_eq!(config.packager_args, vec!["plugin", "package"]);
        assert_eq!(config.package_extension, "difypkg");
        assert!(config.descriptor_log().ends_with("agents.jsonl"));
    }

    #[test]
    fn config_reads_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        // SAFETY: test-only code, serialized by ENV_MUTEX
        unsafe {
            std::env::set_var("AGENTPACK_HOME", "/srv/agentpack");
            std::env::set_var("AGENTPACK_PACKAGER", "/opt/bin/pack");
            std::env::set_var("AGENTPACK_PACKAGER_ARGS", "");
        }

        let config = BuildConfig::from_env();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.home, PathBuf::from("/srv/agentpack"));
        assert_eq!(config.work_dir(), PathBuf::from("/srv/agentpack/work"));
        assert!(config.packager_args.is_empty());
        let packager = config.packager();
        assert_eq!(packager.program, "/opt/bin/pack");
        assert_eq!(packager.output_dir, PathBuf::from("/srv/agentpack/work"));
    }

    #[test]
    fn relative_home_is_made_absolute() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        // SAFETY: test-only code, serialized by ENV_MUTEX
        unsafe { std::env::set_var("AGENTPACK_HOME", "rel_home") };

        let config = BuildConfig::from_env();
        clear_env();
        let config = config.unwrap();

        assert!(config.home.is_absolute());
        assert!(config.home.ends_with("rel_home"));
        assert!(config.packager().output_dir.is_absolute());
    }

    #[test]
    fn config_rejects_empty_packager() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        // SAFETY: test-only code, serialized by ENV_MUTEX
        unsafe { std::env::set_var("AGENTPACK_PACKAGER", " ") };

        let result = BuildConfig::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("AGENTPACK_PACKAGER"));
    }
}
