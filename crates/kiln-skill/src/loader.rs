// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caching skill loader.
//!
//! Each skill id owns one cache cell. Concurrent first loads of the same id
//! share a single parse; `reload` swaps in a fresh cell, so every load that
//! starts after it returns sees the new definition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use kiln_core::KilnError;
use kiln_tool::ToolRegistry;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::definition::{BindingWarning, SkillDefinition, parse_skill, validate_skill_id};

type Cell = Arc<OnceCell<Arc<SkillDefinition>>>;

/// Loads skill documents from a directory and caches them by id.
pub struct SkillLoader {
    dir: PathBuf,
    registry: Arc<ToolRegistry>,
    cells: DashMap<String, Cell>,
}

impl SkillLoader {
    pub fn new(dir: impl Into<PathBuf>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            dir: dir.into(),
            registry,
            cells: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the cached definition, parsing it on first use.
    ///
    /// Failed loads are not cached; the next call tries again.
    pub async fn load(&self, skill_id: &str) -> Result<Arc<SkillDefinition>, KilnError> {
        validate_skill_id(skill_id)?;
        // Clone the cell out so the map shard is not locked across the parse.
        let cell = self.cells.entry(skill_id.to_string()).or_default().clone();
        let skill = cell.get_or_try_init(|| self.read(skill_id)).await?;
        Ok(Arc::clone(skill))
    }

    /// Drops the cached definition of `skill_id` and loads it again.
    pub async fn reload(&self, skill_id: &str) -> Result<Arc<SkillDefinition>, KilnError> {
        validate_skill_id(skill_id)?;
        self.cells
            .insert(skill_id.to_string(), Arc::new(OnceCell::new()));
        info!(skill_id, "skill cache invalidated");
        self.load(skill_id).await
    }

    /// Ids with a populated cache entry, sorted.
    pub fn cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .cells
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Skill ids present in the skills directory, sorted.
    pub async fn list_available(&self) -> Result<Vec<String>, KilnError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(KilnError::Skill {
                    message: format!("cannot read skills directory {}: {e}", self.dir.display()),
                    source: Some(Box::new(e)),
                });
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| KilnError::Skill {
            message: format!("cannot read skills directory {}: {e}", self.dir.display()),
            source: Some(Box::new(e)),
        })? {
            let path = entry.path();
            let id = if path.join("skill.toml").is_file() {
                path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            } else if path.extension().is_some_and(|ext| ext == "toml") && path.is_file() {
                path.file_stem().and_then(|n| n.to_str()).map(str::to_string)
            } else {
                None
            };
            if let Some(id) = id.filter(|id| validate_skill_id(id).is_ok()) {
                ids.push(id);
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn read(&self, skill_id: &str) -> Result<Arc<SkillDefinition>, KilnError> {
        let candidates = [
            self.dir.join(skill_id).join("skill.toml"),
            self.dir.join(format!("{skill_id}.toml")),
        ];

        for path in candidates {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(KilnError::Skill {
                        message: format!("failed to read skill file '{}': {e}", path.display()),
                        source: Some(Box::new(e)),
                    });
                }
            };

            let mut skill = parse_skill(&content, skill_id, path)?;
            skill.warnings = self.check_bindings(&skill);
            debug!(
                skill_id,
                source = %skill.source.display(),
                bindings = skill.bindings.len(),
                warnings = skill.warnings.len(),
                "skill loaded"
            );
            return Ok(Arc::new(skill));
        }

        Err(KilnError::SkillNotFound {
            id: skill_id.to_string(),
        })
    }

    fn check_bindings(&self, skill: &SkillDefinition) -> Vec<BindingWarning> {
        skill
            .bound_tools()
            .filter(|tool| !self.registry.contains(tool))
            .map(|tool| {
                let warning = BindingWarning {
                    skill_id: skill.id.clone(),
                    tool: tool.to_string(),
                };
                warn!(skill_id = %skill.id, tool, "{warning}");
                warning
            })
            .collect()
    }
}
