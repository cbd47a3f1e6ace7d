//! # Build Configuration
//!
//! The `gpc.yaml` file. Every path in it is relative to `project_dir`, which
//! itself defaults to the directory holding the file.
//!
//! ```yaml
//! output_dir: target/classes
//! xsl_source_dirs: [src/main/xsl]
//! catalog: catalog.xml
//! classpath: [lib/common-xsl.jar]
//! compiler:
//!   program: saxon-compile
//! config_filesets:
//!   - dir: src/main/gaulois
//!     includes: ["**/*.xml"]
//!   - uri: cp:/pipes/main.xml
//! ```

use std::path::{Path, PathBuf};

use gpc_core::{GpcError, GpcResult};
use gpc_schema::DEFAULT_SCHEMAS_DIR;
use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "gpc.yaml";

const DEFAULT_OUTPUT_DIR: &str = "target/classes";
const DEFAULT_XSL_SOURCE_DIR: &str = "src/main/xsl";
const DEFAULT_INCLUDE: &str = "**/*.xml";

/// External compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    pub program: String,
    /// Arguments placed before the subcommand.
    #[serde(default)]
    pub args: Vec<String>,
}

/// A set of configuration documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FilesetConfig {
    /// Files under `dir` matching `includes` and none of `excludes`.
    Directory {
        dir: PathBuf,
        #[serde(default)]
        includes: Vec<String>,
        #[serde(default)]
        excludes: Vec<String>,
    },
    /// One document addressed by URI, usually `cp:/...`.
    Uri { uri: String },
}

/// The file as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub project_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub schemas_destination: Option<PathBuf>,
    #[serde(default)]
    pub xsl_source_dirs: Vec<PathBuf>,
    pub catalog: Option<PathBuf>,
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    pub post_compiler: Option<PathBuf>,
    pub compiler: Option<CompilerConfig>,
    #[serde(default)]
    pub config_filesets: Vec<FilesetConfig>,
}

/// Configuration with defaults applied and every path absolute.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub schemas_destination: PathBuf,
    pub xsl_source_dirs: Vec<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub classpath: Vec<PathBuf>,
    pub post_compiler: Option<PathBuf>,
    pub compiler: Option<CompilerConfig>,
    pub filesets: Vec<FilesetConfig>,
}

impl BuildConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> GpcResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GpcError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
            .map_err(|e| GpcError::Configuration(format!("{}: {e}", path.display())))
    }

    pub fn from_yaml(content: &str) -> GpcResult<Self> {
        serde_yaml::from_str(content).map_err(|e| GpcError::Configuration(e.to_string()))
    }

    /// Apply defaults and resolve paths.
    ///
    /// `base_dir` is the directory of the configuration file; `output_dir`
    /// overrides the configured output directory.
    ///
    /// # Errors
    ///
    /// [`GpcError::Configuration`] when no configuration fileset is given or
    /// a fileset is empty.
    pub fn into_settings(
        self,
        base_dir: &Path,
        output_dir: Option<&Path>,
    ) -> GpcResult<BuildSettings> {
        if self.config_filesets.is_empty() {
            return Err(GpcError::Configuration(
                "config_filesets is required and must not be empty".into(),
            ));
        }

        let project_dir = match self.project_dir {
            Some(dir) => base_dir.join(dir),
            None => base_dir.to_path_buf(),
        };
        let at_project = |p: &Path| project_dir.join(p);

        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => at_project(
                self.output_dir
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_OUTPUT_DIR)),
            ),
        };
        let schemas_destination = match &self.schemas_destination {
            Some(dir) => at_project(dir),
            None => output_dir.join(DEFAULT_SCHEMAS_DIR),
        };
        let xsl_source_dirs = if self.xsl_source_dirs.is_empty() {
            vec![at_project(Path::new(DEFAULT_XSL_SOURCE_DIR))]
        } else {
            self.xsl_source_dirs.iter().map(|d| at_project(d)).collect()
        };

        let mut filesets = Vec::with_capacity(self.config_filesets.len());
        for fileset in self.config_filesets {
            filesets.push(match fileset {
                FilesetConfig::Directory {
                    dir,
                    includes,
                    excludes,
                } => FilesetConfig::Directory {
                    dir: at_project(&dir),
                    includes: if includes.is_empty() {
                        vec![DEFAULT_INCLUDE.to_string()]
                    } else {
                        includes
                    },
                    excludes,
                },
                FilesetConfig::Uri { uri } if uri.trim().is_empty() => {
                    return Err(GpcError::Configuration(
                        "config_filesets entry has an empty uri".into(),
                    ));
                }
                uri => uri,
            });
        }

        Ok(BuildSettings {
            catalog: self.catalog.as_deref().map(at_project),
            classpath: self.classpath.iter().map(|p| at_project(p)).collect(),
            post_compiler: self.post_compiler.as_deref().map(at_project),
            compiler: self.compiler,
            xsl_source_dirs,
            schemas_destination,
            output_dir,
            filesets,
            project_dir,
        })
    }
}
