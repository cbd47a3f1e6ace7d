//! # Build Report
//!
//! Deterministic summary of one run: the deduplicated build set, every
//! diagnostic, and what failed. Serialized as JSON for `--report` and
//! `plan --format json`, or rendered as text for `plan`.

use gpc_core::{BuildSetRegistry, Diagnostics, SystemId};
use serde::Serialize;

/// Timestamp format of `generated_at`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformEntry {
    pub identity: String,
    pub target: String,
    pub schemas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub identity: String,
    pub target: String,
    pub transforms: Vec<String>,
    /// Union of the schemas of its transforms, passed to the compiler.
    pub schemas: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub generated_at: String,
    pub success: bool,
    pub transforms: Vec<TransformEntry>,
    pub configs: Vec<ConfigEntry>,
    pub failed_documents: Vec<String>,
    pub compile_failures: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl BuildReport {
    /// Snapshot `registry` (already in identity order).
    pub fn new(
        generated_at: String,
        registry: &BuildSetRegistry,
        failed_documents: &[SystemId],
        compile_failures: &[SystemId],
        diagnostics: Diagnostics,
    ) -> Self {
        let transforms = registry
            .transform_units()
            .map(|unit| TransformEntry {
                identity: unit.identity().to_string(),
                target: unit.target().to_string(),
                schemas: unit.schemas().iter().cloned().collect(),
            })
            .collect();
        let configs = registry
            .config_sets()
            .map(|set| ConfigEntry {
                identity: set.identity().to_string(),
                target: set.target().to_string(),
                transforms: set.transforms().iter().map(SystemId::to_string).collect(),
                schemas: registry.schemas_of(set).into_iter().collect(),
            })
            .collect();
        Self {
            generated_at,
            success: failed_documents.is_empty() && compile_failures.is_empty(),
            transforms,
            configs,
            failed_documents: failed_documents.iter().map(SystemId::to_string).collect(),
            compile_failures: compile_failures.iter().map(SystemId::to_string).collect(),
            diagnostics,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable listing.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("transforms ({}):\n", self.transforms.len()));
        for t in &self.transforms {
            out.push_str(&format!("  {}\n", t.identity));
            out.push_str(&format!("    -> {}\n", t.target));
            for schema in &t.schemas {
                out.push_str(&format!("    schema {schema}\n"));
            }
        }
        out.push_str(&format!("configurations ({}):\n", self.configs.len()));
        for c in &self.configs {
            out.push_str(&format!("  {}\n", c.identity));
            out.push_str(&format!("    -> {}\n", c.target));
            for t in &c.transforms {
                out.push_str(&format!("    uses {t}\n"));
            }
            for schema in &c.schemas {
                out.push_str(&format!("    schema {schema}\n"));
            }
        }
        if !self.diagnostics.is_empty() {
            out.push_str(&format!("diagnostics ({}):\n", self.diagnostics.len()));
            for d in self.diagnostics.iter() {
                out.push_str(&format!("  {d}\n"));
            }
        }
        for doc in &self.failed_documents {
            out.push_str(&format!("FAILED {doc}\n"));
        }
        out
    }
}

/// `generated_at` for a report: the explicit value, else
/// `SOURCE_DATE_EPOCH`, else now (UTC).
pub fn resolve_generated_at(explicit: Option<&str>) -> String {
    if let Some(ts) = explicit {
        return ts.to_string();
    }
    if let Ok(epoch) = std::env::var("SOURCE_DATE_EPOCH") {
        if let Ok(epoch) = epoch.trim().parse::<i64>() {
            if let Some(dt) = chrono::DateTime::from_timestamp(epoch, 0) {
                return dt.format(TIMESTAMP_FORMAT).to_string();
            }
        }
    }
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}
