//! Import table parsing

use tracing::{debug, trace, warn};

use crate::formats::pe::cursor::ByteCursor;
use crate::formats::pe::sections::SectionTable;
use crate::formats::pe::types::*;

/// Raw import descriptor; timestamp and forwarder chain are skipped
#[derive(Debug, Clone, Copy)]
struct ImportDescriptor {
    original_first_thunk: u32,
    name_rva: u32,
    first_thunk: u32,
}

impl ImportDescriptor {
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let original_first_thunk = cursor.read_u32()?;
        cursor.skip(8)?;
        let name_rva = cursor.read_u32()?;
        let first_thunk = cursor.read_u32()?;
        Ok(Self {
            original_first_thunk,
            name_rva,
            first_thunk,
        })
    }

    fn is_terminator(&self) -> bool {
        self.original_first_thunk == 0 && self.name_rva == 0
    }

    /// Bound images may drop the lookup table and keep only the IAT
    fn thunk_rva(&self) -> u32 {
        if self.original_first_thunk != 0 {
            self.original_first_thunk
        } else {
            self.first_thunk
        }
    }
}

/// Parse import table from PE data.
///
/// A broken descriptor or module name ends the scan and keeps the modules
/// decoded so far. A broken thunk list only truncates that module.
pub fn parse_imports(
    data: &[u8],
    sections: &SectionTable,
    import_dir: &DataDirectory,
    kind: ImageKind,
    options: &ParseOptions,
) -> Vec<ImportedModule> {
    let mut modules = Vec::new();
    if !import_dir.is_present() || !options.parse_imports {
        return modules;
    }

    let mut offset = match sections.resolve(import_dir.virtual_address) {
        Ok(offset) => offset,
        Err(e) => {
            warn!(error = %e, "Import directory unresolved; skipping imports");
            return modules;
        }
    };

    let mut cursor = ByteCursor::new(data);
    let mut scanned = 0usize;
    // Descriptors may share one lookup table, so per-module caps alone do
    // not bound the total
    let mut remaining = options.max_total_imports;

    // Parse import descriptors
    loop {
        let descriptor = match cursor
            .seek(offset)
            .and_then(|_| ImportDescriptor::read(&mut cursor))
        {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(error = %e, modules = modules.len(), "Import descriptor unreadable");
                break;
            }
        };

        if descriptor.is_terminator() {
            break;
        }
        if scanned >= options.max_import_modules {
            warn!(
                limit = options.max_import_modules,
                "Import descriptor count exceeds limit; truncating"
            );
            break;
        }
        scanned += 1;
        offset += IMPORT_DESCRIPTOR_SIZE;

        // Skip invalid entries
        if descriptor.name_rva == 0 {
            continue;
        }

        let name = match sections
            .resolve(descriptor.name_rva)
            .and_then(|at| cursor.read_cstring_at(at, options.max_string_len))
        {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, modules = modules.len(), "Import module name unreadable");
                break;
            }
        };

        if name.is_empty() {
            continue;
        }

        let limit = options.max_imports_per_module.min(remaining);
        let functions = parse_thunks(
            &mut cursor,
            sections,
            descriptor.thunk_rva(),
            kind,
            limit,
            options,
        );
        remaining -= functions.len();
        debug!(module = %name, count = functions.len(), "Parsed import module");
        modules.push(ImportedModule { name, functions });

        if remaining == 0 {
            warn!(
                limit = options.max_total_imports,
                modules = modules.len(),
                "Total import count exceeds limit; stopping"
            );
            break;
        }
    }

    modules
}

fn parse_thunks(
    cursor: &mut ByteCursor<'_>,
    sections: &SectionTable,
    thunk_rva: u32,
    kind: ImageKind,
    limit: usize,
    options: &ParseOptions,
) -> Vec<ImportedFunction> {
    let mut functions = Vec::new();
    if thunk_rva == 0 {
        return functions;
    }

    let mut thunk_offset = match sections.resolve(thunk_rva) {
        Ok(offset) => offset,
        Err(e) => {
            warn!(error = %e, "Import lookup table unresolved");
            return functions;
        }
    };

    loop {
        if functions.len() >= limit {
            warn!(limit, "Import count exceeds limit; truncating module");
            break;
        }

        match read_thunk(cursor, sections, thunk_offset, kind, options.max_string_len) {
            Ok(Some(function)) => {
                trace!(?function, "Import");
                functions.push(function);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, decoded = functions.len(), "Import lookup table truncated");
                break;
            }
        }

        thunk_offset += kind.thunk_size() as u64;
    }

    functions
}

/// Decode one lookup-table entry; `None` marks the end of the list
fn read_thunk(
    cursor: &mut ByteCursor<'_>,
    sections: &SectionTable,
    offset: u64,
    kind: ImageKind,
    max_string_len: usize,
) -> Result<Option<ImportedFunction>> {
    cursor.seek(offset)?;
    let value = match kind {
        ImageKind::Pe32 => u64::from(cursor.read_u32()?),
        ImageKind::Pe32Plus => cursor.read_u64()?,
    };

    if value == 0 {
        return Ok(None);
    }

    let flag = kind.ordinal_flag();
    if value & flag != 0 {
        return Ok(Some(ImportedFunction::ByOrdinal {
            ordinal: (value & 0xFFFF) as u16,
        }));
    }

    let hint_name_rva = value & !flag;
    let rva = u32::try_from(hint_name_rva).map_err(|_| PeError::UnresolvedRva {
        rva: hint_name_rva,
    })?;
    cursor.seek(sections.resolve(rva)?)?;
    let hint = cursor.read_u16()?;
    let name = cursor.read_cstring(max_string_len)?;

    Ok(Some(ImportedFunction::ByName { name, hint }))
}
