//! PE parser: headers, section table, export and import directories

use std::cell::OnceCell;

pub mod cursor;
pub mod directories;
pub mod headers;
pub mod sections;
pub mod types;

#[cfg(test)]
pub(crate) mod test_image;

use cursor::ByteCursor;
use directories::*;
use headers::*;
use sections::parse_section_table;
pub use sections::{rva_to_file_offset, SectionTable};
pub use types::*;

/// Main PE parser
pub struct PeParser<'data> {
    data: &'data [u8],
    nt_headers: NtHeaders,
    section_table: SectionTable,
    options: ParseOptions,

    // Lazy-loaded data
    imports: OnceCell<Vec<ImportedModule>>,
    exports: OnceCell<Vec<ExportedFunction>>,
}

impl<'data> PeParser<'data> {
    /// Create parser with default options
    pub fn new(data: &'data [u8]) -> Result<Self> {
        Self::with_options(data, ParseOptions::default())
    }

    /// Create parser with custom options.
    ///
    /// Fails only on header and section-table problems; directory problems
    /// surface later as empty or partial tables.
    pub fn with_options(data: &'data [u8], options: ParseOptions) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let nt_headers = parse_nt_headers(&mut cursor)?;

        // No optional header means no directories and nothing to translate
        let section_table = if nt_headers.optional_header.is_some() {
            parse_section_table(
                &mut cursor,
                nt_headers.section_table_offset(),
                nt_headers.file_header.number_of_sections,
            )?
        } else {
            SectionTable::default()
        };

        Ok(Self {
            data,
            nt_headers,
            section_table,
            options,
            imports: OnceCell::new(),
            exports: OnceCell::new(),
        })
    }

    /// Get NT headers
    pub fn nt_headers(&self) -> &NtHeaders {
        &self.nt_headers
    }

    /// Get machine type
    pub fn machine(&self) -> Machine {
        self.nt_headers.file_header.machine
    }

    /// Check if PE is 64-bit
    pub fn is_64bit(&self) -> bool {
        self.nt_headers.is_64bit()
    }

    pub fn is_dll(&self) -> bool {
        self.nt_headers.file_header.is_dll()
    }

    /// Get all sections
    pub fn sections(&self) -> &[SectionDescriptor] {
        self.section_table.sections()
    }

    /// Convert RVA to file offset
    pub fn rva_to_offset(&self, rva: u32) -> Option<u64> {
        self.section_table.rva_to_offset(rva)
    }

    /// Get exports (lazy-loaded)
    pub fn exports(&self) -> &[ExportedFunction] {
        self.exports.get_or_init(|| match self.nt_headers.optional_header {
            Some(optional) => parse_exports(
                self.data,
                &self.section_table,
                &optional.export_directory,
                &self.options,
            ),
            None => Vec::new(),
        })
    }

    /// Get imports (lazy-loaded)
    pub fn imports(&self) -> &[ImportedModule] {
        self.imports.get_or_init(|| match self.nt_headers.optional_header {
            Some(optional) => parse_imports(
                self.data,
                &self.section_table,
                &optional.import_directory,
                optional.kind,
                &self.options,
            ),
            None => Vec::new(),
        })
    }

    /// Consume the parser, returning decoded exports and imports
    pub fn into_tables(self) -> (Vec<ExportedFunction>, Vec<ImportedModule>) {
        self.exports();
        self.imports();
        (
            self.exports.into_inner().unwrap_or_default(),
            self.imports.into_inner().unwrap_or_default(),
        )
    }
}
