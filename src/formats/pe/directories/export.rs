//! Export table parsing

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::formats::pe::cursor::ByteCursor;
use crate::formats::pe::sections::SectionTable;
use crate::formats::pe::types::*;

/// Fields of the export directory table that drive the walk
#[derive(Debug, Clone, Copy)]
struct ExportDirectory {
    ordinal_base: u32,
    number_of_functions: u32,
    number_of_names: u32,
    address_table_rva: u32,
    name_table_rva: u32,
    ordinal_table_rva: u32,
}

fn read_export_directory(
    cursor: &mut ByteCursor<'_>,
    sections: &SectionTable,
    export_dir: &DataDirectory,
) -> Result<ExportDirectory> {
    cursor.seek(sections.resolve(export_dir.virtual_address)?)?;

    // Characteristics, TimeDateStamp, Major/MinorVersion, Name
    cursor.skip(16)?;
    Ok(ExportDirectory {
        ordinal_base: cursor.read_u32()?,
        number_of_functions: cursor.read_u32()?,
        number_of_names: cursor.read_u32()?,
        address_table_rva: cursor.read_u32()?,
        name_table_rva: cursor.read_u32()?,
        ordinal_table_rva: cursor.read_u32()?,
    })
}

/// Map function-table index to export name
fn read_name_lookup(
    cursor: &mut ByteCursor<'_>,
    sections: &SectionTable,
    dir: &ExportDirectory,
    number_of_names: u32,
    max_string_len: usize,
) -> Result<HashMap<u32, String>> {
    let mut names = HashMap::new();
    if number_of_names == 0 {
        return Ok(names);
    }

    let name_table = sections.resolve(dir.name_table_rva)?;
    let ordinal_table = sections.resolve(dir.ordinal_table_rva)?;

    for i in 0..u64::from(number_of_names) {
        cursor.seek(name_table + i * 4)?;
        let name_rva = cursor.read_u32()?;
        cursor.seek(ordinal_table + i * 2)?;
        let index = cursor.read_u16()?;

        let name = cursor.read_cstring_at(sections.resolve(name_rva)?, max_string_len)?;
        names.insert(u32::from(index), name);
    }

    Ok(names)
}

/// Parse export table from PE data.
///
/// Failures never escape: a broken directory or name table yields an empty
/// list, a broken function table yields the exports decoded before it.
pub fn parse_exports(
    data: &[u8],
    sections: &SectionTable,
    export_dir: &DataDirectory,
    options: &ParseOptions,
) -> Vec<ExportedFunction> {
    if !export_dir.is_present() || !options.parse_exports {
        return Vec::new();
    }

    let mut cursor = ByteCursor::new(data);
    let dir = match read_export_directory(&mut cursor, sections, export_dir) {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "Export directory unreadable; skipping exports");
            return Vec::new();
        }
    };

    // Limit exports to prevent DOS
    let limit = u32::try_from(options.max_exports).unwrap_or(u32::MAX);
    let number_of_functions = dir.number_of_functions.min(limit);
    if number_of_functions < dir.number_of_functions {
        warn!(
            declared = dir.number_of_functions,
            limit = options.max_exports,
            "Export function count exceeds limit; truncating"
        );
    }
    // Not every ordinal has a name. Capped independently of the function
    // count: the name table is sorted by name, not by slot.
    let number_of_names = dir
        .number_of_names
        .min(dir.number_of_functions)
        .min(limit);

    let names = match read_name_lookup(
        &mut cursor,
        sections,
        &dir,
        number_of_names,
        options.max_string_len,
    ) {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "Export name table unreadable; skipping exports");
            return Vec::new();
        }
    };

    let mut exports = Vec::new();
    if number_of_functions == 0 {
        return exports;
    }

    let address_table = match sections.resolve(dir.address_table_rva) {
        Ok(offset) => offset,
        Err(e) => {
            warn!(error = %e, "Export address table unresolved; skipping exports");
            return exports;
        }
    };

    for i in 0..number_of_functions {
        let rva = match cursor
            .seek(address_table + u64::from(i) * 4)
            .and_then(|_| cursor.read_u32())
        {
            Ok(rva) => rva,
            Err(e) => {
                warn!(error = %e, decoded = exports.len(), "Export address table truncated");
                break;
            }
        };
        if rva == 0 {
            continue; // Unused slot
        }

        // RVA points inside export directory = forwarder
        let forwarder = if export_dir.contains(rva) {
            sections
                .rva_to_offset(rva)
                .and_then(|offset| cursor.read_cstring_at(offset, options.max_string_len).ok())
        } else {
            None
        };

        let export = ExportedFunction {
            ordinal: dir.ordinal_base.wrapping_add(i),
            name: names.get(&i).cloned(),
            rva,
            forwarder,
        };
        trace!(ordinal = export.ordinal, name = ?export.name, rva, "Export");
        exports.push(export);
    }

    debug!(count = exports.len(), "Parsed exports");
    exports
}
