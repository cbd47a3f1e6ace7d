//! # Build Session
//!
//! One build invocation, in two passes:
//!
//! 1. **Scan.** Every configuration document is scanned in the supplied
//!    order. A document that fails registers nothing. A successful one gets
//!    its configuration set, and every transform it references is looked up
//!    in the registry; only a newly created transform unit triggers schema
//!    discovery.
//! 2. **Compile.** Starts only after all documents are scanned. Each
//!    transform unit is compiled once, then each configuration set is
//!    compiled with the union of its transforms' schemas.
//!
//! Failures are accumulated as diagnostics; every independent unit is
//! attempted. The session owns the registry, so nothing leaks between runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gpc_core::{
    BuildSetRegistry, Diagnostics, GpcError, GpcResult, SystemId, TargetPath, CLASSPATH_SCHEME,
};
use gpc_resolve::{
    CatalogResolver, ClasspathEntry, NoCatalog, ResolvedResource, ResourceResolver, XmlCatalog,
};
use gpc_scan::ConfigScanner;
use gpc_schema::{SchemaWalker, StaticDependencyExtractor};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::compiler::Compiler;
use crate::config::{BuildSettings, FilesetConfig};
use crate::fileset::{collect_files, relative_slash_path};
use crate::report::BuildReport;

/// A configuration document to scan, with its output location.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    pub resource: ResolvedResource,
    pub target: TargetPath,
}

/// State of one build invocation.
#[derive(Debug)]
pub struct BuildSession {
    settings: BuildSettings,
    resolver: ResourceResolver,
    registry: BuildSetRegistry,
    diagnostics: Diagnostics,
    failed_documents: Vec<SystemId>,
    compile_failures: Vec<SystemId>,
    post_processor: Option<PathBuf>,
}

impl BuildSession {
    /// Set up the resolver (search roots, catalog, classpath) for `settings`.
    ///
    /// # Errors
    ///
    /// [`GpcError::Configuration`] when the catalog cannot be loaded.
    pub fn new(settings: BuildSettings) -> GpcResult<Self> {
        let catalog: Box<dyn CatalogResolver> = match &settings.catalog {
            Some(path) => Box::new(XmlCatalog::load(path)?),
            None => Box::new(NoCatalog),
        };
        let classpath = settings
            .classpath
            .iter()
            .map(ClasspathEntry::from_path)
            .collect();
        let resolver = ResourceResolver::new(settings.xsl_source_dirs.clone(), classpath, catalog);

        let mut diagnostics = Diagnostics::new();
        let post_processor = match &settings.post_compiler {
            Some(path) if path.is_file() => Some(path.clone()),
            Some(path) => {
                let err = GpcError::Configuration(format!(
                    "post compiler {} does not exist, it is ignored",
                    path.display()
                ));
                warn!(path = %path.display(), "post compiler not found, ignored");
                diagnostics.warn(&err);
                None
            }
            None => None,
        };

        Ok(Self {
            settings,
            resolver,
            registry: BuildSetRegistry::new(),
            diagnostics,
            failed_documents: Vec::new(),
            compile_failures: Vec::new(),
            post_processor,
        })
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &BuildSetRegistry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Documents that failed to resolve or scan, in scan order.
    pub fn failed_documents(&self) -> &[SystemId] {
        &self.failed_documents
    }

    /// Transforms and configurations the compiler rejected.
    pub fn compile_failures(&self) -> &[SystemId] {
        &self.compile_failures
    }

    /// Whether no document failed and nothing failed to compile.
    pub fn succeeded(&self) -> bool {
        self.failed_documents.is_empty() && self.compile_failures.is_empty()
    }

    /// Enumerate the configuration documents of every fileset, in fileset
    /// order. URI filesets that cannot be resolved are recorded as failed
    /// documents.
    ///
    /// # Errors
    ///
    /// [`GpcError::Configuration`] for an unusable fileset, or when no
    /// document is found at all.
    pub fn collect_documents(&mut self) -> GpcResult<Vec<ConfigDocument>> {
        let mut documents = Vec::new();
        for fileset in &self.settings.filesets {
            match fileset {
                FilesetConfig::Directory {
                    dir,
                    includes,
                    excludes,
                } => {
                    for path in collect_files(dir, includes, excludes)? {
                        let relative = relative_slash_path(dir, &path);
                        let identity = SystemId::from_path(&path)?;
                        documents.push(ConfigDocument {
                            resource: ResolvedResource::new(
                                identity,
                                gpc_resolve::SourceKind::LocalFile,
                            ),
                            target: TargetPath::new(self.settings.output_dir.join(relative)),
                        });
                    }
                }
                FilesetConfig::Uri { uri } => match self.resolver.resolve(uri) {
                    Ok(resource) => documents.push(ConfigDocument {
                        resource,
                        target: TargetPath::new(
                            self.settings.output_dir.join(uri_document_path(uri)),
                        ),
                    }),
                    Err(err) => {
                        let identity = SystemId::new(uri.as_str());
                        if self.failed_documents.contains(&identity) {
                            continue;
                        }
                        error!(uri = %uri, error = %err, "configuration document not found");
                        self.diagnostics.error(&err);
                        self.failed_documents.push(identity);
                    }
                },
            }
        }

        if documents.is_empty() && self.failed_documents.is_empty() {
            return Err(GpcError::Configuration(
                "no configuration documents found in config_filesets".into(),
            ));
        }
        info!(documents = documents.len(), "configuration documents collected");
        Ok(documents)
    }

    /// Scan pass over every configured document.
    pub fn scan_all(&mut self) -> GpcResult<()> {
        let documents = self.collect_documents()?;
        self.scan(&documents);
        Ok(())
    }

    /// Scan pass over `documents`, in order.
    pub fn scan(&mut self, documents: &[ConfigDocument]) {
        for document in documents {
            self.scan_document(document);
        }
        info!(
            configs = self.registry.config_count(),
            transforms = self.registry.transform_count(),
            failed = self.failed_documents.len(),
            "scan pass finished"
        );
    }

    /// Scan one document and register what it references.
    pub fn scan_document(&mut self, document: &ConfigDocument) {
        let identity = document.resource.identity();
        if self.registry.contains_config(identity) {
            debug!(identity = %identity, "configuration already registered");
            return;
        }
        if self.failed_documents.contains(identity) {
            debug!(identity = %identity, "configuration already failed");
            return;
        }

        let outcome = ConfigScanner::new(&self.resolver).scan_resource(&document.resource);
        let failed = outcome.failed;
        self.diagnostics.extend(outcome.diagnostics);
        if failed {
            self.failed_documents.push(identity.clone());
            return;
        }

        let planned: Vec<(SystemId, TargetPath)> = outcome
            .transforms
            .into_iter()
            .map(|resource| {
                let id = resource.into_identity();
                let target = match self.registry.transform_unit(&id) {
                    Some(unit) => unit.target().clone(),
                    None => self.resolver.target_path(&self.settings.output_dir, &id),
                };
                (id, target)
            })
            .collect();

        if let Err(err) = self.check_targets(identity, &document.target, &planned) {
            error!(identity = %identity, error = %err, "output path collision");
            self.diagnostics.error(&err);
            self.failed_documents.push(identity.clone());
            return;
        }

        let extractor = StaticDependencyExtractor::new(&self.resolver);
        let walker = SchemaWalker::new(
            &self.settings.output_dir,
            &self.settings.schemas_destination,
            &extractor,
        );
        for (id, target) in &planned {
            match self
                .registry
                .get_or_create_transform_unit(id.clone(), target.clone())
            {
                Ok((_, true)) => {}
                Ok((_, false)) => {
                    debug!(identity = %id, "transform already registered");
                    continue;
                }
                Err(err) => {
                    self.diagnostics.error(&err);
                    continue;
                }
            }
            debug!(identity = %id, target = %target, "transform registered");
            let base_dir = target
                .as_path()
                .parent()
                .and_then(|dir| dir.strip_prefix(&self.settings.output_dir).ok())
                .unwrap_or(Path::new(""));
            match walker.discover(id, base_dir, &mut self.registry) {
                Ok(discovery) => {
                    if let Some(unit) = self.registry.transform_unit_mut(id) {
                        for schema in &discovery.schemas {
                            unit.add_schema(schema.access_uri.clone());
                        }
                    }
                    self.diagnostics.extend(discovery.warnings);
                }
                Err(err) => {
                    warn!(identity = %id, error = %err, "schema discovery failed, no schemas recorded");
                    self.diagnostics.warn(&err);
                }
            }
        }

        match self
            .registry
            .get_or_create_config_set(identity.clone(), document.target.clone())
        {
            Ok((set, _)) => {
                for (id, _) in planned {
                    set.add_transform(id);
                }
            }
            Err(err) => {
                self.diagnostics.error(&err);
                self.failed_documents.push(identity.clone());
            }
        }
    }

    /// Reject a document whose registration would give one output path to
    /// two identities.
    fn check_targets(
        &self,
        identity: &SystemId,
        document_target: &TargetPath,
        planned: &[(SystemId, TargetPath)],
    ) -> GpcResult<()> {
        let mut claimed: BTreeMap<&Path, &SystemId> = BTreeMap::new();
        let candidates = std::iter::once((identity, document_target)).chain(
            planned
                .iter()
                .filter(|(id, _)| !self.registry.contains_transform(id))
                .map(|(id, target)| (id, target)),
        );
        for (id, target) in candidates {
            let owner = self
                .registry
                .target_owner(target)
                .or_else(|| claimed.get(target.as_path()).copied());
            if let Some(owner) = owner {
                if owner != id {
                    return Err(GpcError::scan(
                        identity.as_str(),
                        format!("target {target} of {id} is already assigned to {owner}"),
                    ));
                }
            }
            claimed.insert(target.as_path(), id);
        }
        Ok(())
    }

    /// Compile pass: every transform unit once, then every configuration set.
    pub fn compile(&mut self, compiler: &mut dyn Compiler) {
        for unit in self.registry.transform_units() {
            if let Err(err) = compiler.compile_transform(unit.identity(), unit.target().as_path()) {
                error!(identity = %unit.identity(), error = %err, "transform failed to compile");
                self.diagnostics.error(&err);
                self.compile_failures.push(unit.identity().clone());
            }
        }
        for set in self.registry.config_sets() {
            let schemas: Vec<String> = self.registry.schemas_of(set).into_iter().collect();
            if let Err(err) = compiler.compile_config(
                set.identity(),
                set.target().as_path(),
                &schemas,
                self.post_processor.as_deref(),
            ) {
                error!(identity = %set.identity(), error = %err, "configuration failed to compile");
                self.diagnostics.error(&err);
                self.compile_failures.push(set.identity().clone());
            }
        }
        info!(
            transforms = self.registry.transform_count(),
            configs = self.registry.config_count(),
            failures = self.compile_failures.len(),
            "compile pass finished"
        );
    }

    pub fn report(&self, generated_at: String) -> BuildReport {
        BuildReport::new(
            generated_at,
            &self.registry,
            &self.failed_documents,
            &self.compile_failures,
            self.diagnostics.clone(),
        )
    }
}

/// Output path of a URI-addressed document: the path after `cp:/` (or the
/// URI path), without query or fragment, never climbing above the root.
fn uri_document_path(uri: &str) -> String {
    let end = uri.find(|c: char| c == '?' || c == '#').unwrap_or(uri.len());
    let uri = &uri[..end];
    let path = match uri.strip_prefix(CLASSPATH_SCHEME) {
        Some(path) => path.to_string(),
        None => Url::parse(uri)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| uri.to_string()),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
