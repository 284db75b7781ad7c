//! The immutable outcome of analyzing one image

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::formats::pe::{ExportedFunction, ImportedFunction, ImportedModule, Machine};

/// What an image exports and imports.
///
/// Built once per analysis and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    file_path: PathBuf,
    file_name: String,
    machine: Machine,
    is_64bit: bool,
    is_dll: bool,
    exports: Vec<ExportedFunction>,
    imports: Vec<ImportedModule>,
}

impl AnalysisResult {
    pub fn new(
        file_path: &Path,
        machine: Machine,
        is_64bit: bool,
        is_dll: bool,
        exports: Vec<ExportedFunction>,
        imports: Vec<ImportedModule>,
    ) -> Self {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file_path: file_path.to_path_buf(),
            file_name,
            machine,
            is_64bit,
            is_dll,
            exports,
            imports,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn machine(&self) -> Machine {
        self.machine
    }

    pub fn is_64bit(&self) -> bool {
        self.is_64bit
    }

    pub fn is_dll(&self) -> bool {
        self.is_dll
    }

    /// Exports in function-table order
    pub fn exports(&self) -> &[ExportedFunction] {
        &self.exports
    }

    /// Import modules in descriptor order
    pub fn imports(&self) -> &[ImportedModule] {
        &self.imports
    }

    pub fn export_by_name(&self, name: &str) -> Option<&ExportedFunction> {
        self.exports
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
    }

    pub fn export_by_ordinal(&self, ordinal: u32) -> Option<&ExportedFunction> {
        self.exports.iter().find(|e| e.ordinal == ordinal)
    }

    /// Module names compare ASCII case-insensitively, like the loader does
    pub fn imported_module(&self, name: &str) -> Option<&ImportedModule> {
        self.imports
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Total imported functions across all modules
    pub fn import_count(&self) -> usize {
        self.imports.iter().map(|m| m.functions.len()).sum()
    }

    /// Calculate import hash (imphash).
    ///
    /// `None` when the image imports nothing.
    pub fn import_hash(&self) -> Option<String> {
        let mut entries = Vec::new();

        for module in &self.imports {
            let lib = module.name.to_ascii_lowercase();
            let lib = match lib.rsplit_once('.') {
                Some((stem, "dll" | "ocx" | "sys")) => stem.to_string(),
                _ => lib.clone(),
            };
            for function in &module.functions {
                let func = match function {
                    ImportedFunction::ByName { name, .. } => name.to_ascii_lowercase(),
                    ImportedFunction::ByOrdinal { ordinal } => format!("ord{}", ordinal),
                };
                entries.push(format!("{}.{}", lib, func));
            }
        }

        if entries.is_empty() {
            return None;
        }
        let joined = entries.join(",");
        Some(format!("{:x}", md5::compute(joined.as_bytes())))
    }
}
