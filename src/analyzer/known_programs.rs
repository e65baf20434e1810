//! Registry of known program names

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};
use once_cell::sync::Lazy;
use solana_pubkey::Pubkey;

use crate::constants::programs::builtin_programs;
use crate::constants::UNKNOWN_PROGRAM_NAME;
use crate::errors::{DebuggerError, DebuggerResult};

static BUILTIN: Lazy<Arc<ProgramRegistry>> = Lazy::new(|| Arc::new(ProgramRegistry::builtin()));

/// Maps program ids to display names.
///
/// A registry is immutable once handed to a debugger; extend it with the
/// builder-style methods before that.
#[derive(Debug, Clone, Default)]
pub struct ProgramRegistry {
    names: HashMap<String, String>,
}

impl ProgramRegistry {
    /// A registry that knows no programs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry populated with runtime and common ecosystem programs.
    pub fn builtin() -> Self {
        let names = builtin_programs()
            .into_iter()
            .map(|(address, name)| (address, name.to_string()))
            .collect();
        Self { names }
    }

    /// The process-wide built-in registry.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Add or rename a program. The id must be a valid address.
    pub fn with_program(mut self, program_id: &str, name: &str) -> DebuggerResult<Self> {
        Pubkey::from_str(program_id)
            .map_err(|e| DebuggerError::InvalidProgramId(format!("{}: {}", program_id, e)))?;
        self.names.insert(program_id.to_string(), name.to_string());
        Ok(self)
    }

    /// Add programs from a JSON object of `{ "<program id>": "<name>" }`.
    pub fn extend_from_json(self, json: &str) -> DebuggerResult<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(json)?;

        // Sorted so a bad entry is reported deterministically.
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort();

        entries
            .into_iter()
            .try_fold(self, |registry, (program_id, name)| {
                registry.with_program(&program_id, &name)
            })
    }

    /// Add programs from a JSON override file.
    pub fn load_overrides(self, path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read program overrides: {}", path.display()))?;

        let before = self.len();
        let registry = self
            .extend_from_json(&json)
            .with_context(|| format!("Failed to apply program overrides: {}", path.display()))?;

        info!(
            "Loaded {} program name overrides from {}",
            registry.len().saturating_sub(before),
            path.display()
        );
        Ok(registry)
    }

    /// Display name for a program id, or "Unknown Program".
    pub fn name_of(&self, program_id: &str) -> &str {
        match self.names.get(program_id) {
            Some(name) => name,
            None => {
                debug!("No registry entry for program {}", program_id);
                UNKNOWN_PROGRAM_NAME
            }
        }
    }

    pub fn contains(&self, program_id: &str) -> bool {
        self.names.contains_key(program_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
