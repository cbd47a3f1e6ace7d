//! # Build-Set Registry
//!
//! Single source of truth for "have we seen this identity before". Holds one
//! [`ConfigSet`] per configuration-document identity and one
//! [`TransformUnit`] per transform identity, both keyed and iterated in
//! identity order so every run walks the build set the same way.
//!
//! Configuration sets refer to transforms by identity; the units themselves
//! live only in the registry and are shared by every set that uses them.
//!
//! The registry does no resolution and no I/O. It is mutated only during the
//! scan pass (schema sets are append-only) and read during the compile pass.
//! Get-or-create is a single `&mut self` call, so the check and the insert
//! can never be split.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{GpcError, GpcResult};
use crate::identity::{SystemId, TargetPath};

/// A transform to compile exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformUnit {
    identity: SystemId,
    target: TargetPath,
    schemas: BTreeSet<String>,
}

impl TransformUnit {
    fn new(identity: SystemId, target: TargetPath) -> Self {
        Self {
            identity,
            target,
            schemas: BTreeSet::new(),
        }
    }

    pub fn identity(&self) -> &SystemId {
        &self.identity
    }

    pub fn target(&self) -> &TargetPath {
        &self.target
    }

    /// Access URIs (`cp:/...`) of every schema discovered for this transform.
    pub fn schemas(&self) -> &BTreeSet<String> {
        &self.schemas
    }

    /// Append a schema access URI. Returns `false` if it was already known.
    pub fn add_schema(&mut self, access_uri: impl Into<String>) -> bool {
        self.schemas.insert(access_uri.into())
    }
}

/// A configuration document and the transforms it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSet {
    identity: SystemId,
    target: TargetPath,
    transforms: BTreeSet<SystemId>,
}

impl ConfigSet {
    fn new(identity: SystemId, target: TargetPath) -> Self {
        Self {
            identity,
            target,
            transforms: BTreeSet::new(),
        }
    }

    pub fn identity(&self) -> &SystemId {
        &self.identity
    }

    pub fn target(&self) -> &TargetPath {
        &self.target
    }

    /// Identities of the transforms this document references.
    pub fn transforms(&self) -> &BTreeSet<SystemId> {
        &self.transforms
    }

    pub fn add_transform(&mut self, identity: SystemId) -> bool {
        self.transforms.insert(identity)
    }
}

/// Identity-keyed tables for one build invocation.
#[derive(Debug, Default)]
pub struct BuildSetRegistry {
    configs: BTreeMap<SystemId, ConfigSet>,
    transforms: BTreeMap<SystemId, TransformUnit>,
    /// Owner of every assigned output path, for collision detection.
    targets: BTreeMap<PathBuf, SystemId>,
    /// Source URI of every materialized schema file.
    schema_files: BTreeMap<PathBuf, String>,
}

impl BuildSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_config(&self, identity: &SystemId) -> bool {
        self.configs.contains_key(identity)
    }

    pub fn contains_transform(&self, identity: &SystemId) -> bool {
        self.transforms.contains_key(identity)
    }

    /// Fetch the set for `identity`, creating it with `target` if this is the
    /// first time the identity is seen. The flag is `true` on creation.
    ///
    /// # Errors
    ///
    /// [`GpcError::Scan`] if `target` is already assigned to another identity.
    pub fn get_or_create_config_set(
        &mut self,
        identity: SystemId,
        target: TargetPath,
    ) -> GpcResult<(&mut ConfigSet, bool)> {
        let created = !self.configs.contains_key(&identity);
        if created {
            self.claim_target(&identity, &target)?;
        }
        let set = self
            .configs
            .entry(identity.clone())
            .or_insert_with(|| ConfigSet::new(identity, target));
        Ok((set, created))
    }

    /// Fetch the unit for `identity`, creating it with `target` if this is
    /// the first time the identity is seen. The flag is `true` on creation.
    ///
    /// The target of an existing unit is never replaced: the path assigned on
    /// first registration is the one every later lookup sees.
    ///
    /// # Errors
    ///
    /// [`GpcError::Scan`] if `target` is already assigned to another identity.
    pub fn get_or_create_transform_unit(
        &mut self,
        identity: SystemId,
        target: TargetPath,
    ) -> GpcResult<(&mut TransformUnit, bool)> {
        let created = !self.transforms.contains_key(&identity);
        if created {
            self.claim_target(&identity, &target)?;
        }
        let unit = self
            .transforms
            .entry(identity.clone())
            .or_insert_with(|| TransformUnit::new(identity, target));
        Ok((unit, created))
    }

    /// Identity that owns `target`, if any.
    pub fn target_owner(&self, target: &TargetPath) -> Option<&SystemId> {
        self.targets.get(target.as_path())
    }

    /// Record that the schema file `file` holds the bytes of `source`.
    ///
    /// Claiming the same file again for the same source is a no-op.
    ///
    /// # Errors
    ///
    /// [`GpcError::Discovery`] if `file` already holds another source.
    pub fn claim_schema_file(&mut self, file: &Path, source: &str) -> GpcResult<()> {
        match self.schema_files.get(file) {
            Some(owner) if owner != source => Err(GpcError::discovery(
                source,
                format!("{} already holds {owner}", file.display()),
            )),
            Some(_) => Ok(()),
            None => {
                self.schema_files
                    .insert(file.to_path_buf(), source.to_string());
                Ok(())
            }
        }
    }

    /// Source URI materialized at `file`, if any.
    pub fn schema_file_source(&self, file: &Path) -> Option<&str> {
        self.schema_files.get(file).map(String::as_str)
    }

    pub fn config_set(&self, identity: &SystemId) -> Option<&ConfigSet> {
        self.configs.get(identity)
    }

    pub fn transform_unit(&self, identity: &SystemId) -> Option<&TransformUnit> {
        self.transforms.get(identity)
    }

    pub fn transform_unit_mut(&mut self, identity: &SystemId) -> Option<&mut TransformUnit> {
        self.transforms.get_mut(identity)
    }

    /// All configuration sets, sorted by identity.
    pub fn config_sets(&self) -> impl Iterator<Item = &ConfigSet> {
        self.configs.values()
    }

    /// All transform units, sorted by identity.
    pub fn transform_units(&self) -> impl Iterator<Item = &TransformUnit> {
        self.transforms.values()
    }

    pub fn config_count(&self) -> usize {
        self.configs.len()
    }

    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Union of the schema access URIs of every transform in `config`.
    pub fn schemas_of(&self, config: &ConfigSet) -> BTreeSet<String> {
        config
            .transforms
            .iter()
            .filter_map(|id| self.transforms.get(id))
            .flat_map(|unit| unit.schemas.iter().cloned())
            .collect()
    }

    fn claim_target(&mut self, identity: &SystemId, target: &TargetPath) -> GpcResult<()> {
        let key = target.as_path().to_path_buf();
        match self.targets.get(&key) {
            Some(owner) if owner != identity => Err(GpcError::scan(
                identity.as_str(),
                format!("target {target} is already assigned to {owner}"),
            )),
            Some(_) => Ok(()),
            None => {
                self.targets.insert(key, identity.clone());
                Ok(())
            }
        }
    }
}
