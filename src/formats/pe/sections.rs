//! Section table parsing and RVA translation

use tracing::trace;

use crate::formats::pe::cursor::ByteCursor;
use crate::formats::pe::types::*;

/// Section table in file order
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    sections: Vec<SectionDescriptor>,
}

impl SectionTable {
    /// Create a new section table; order is kept as given
    pub fn new(sections: Vec<SectionDescriptor>) -> Self {
        Self { sections }
    }

    /// Get all sections
    pub fn sections(&self) -> &[SectionDescriptor] {
        &self.sections
    }

    /// Find section by name
    pub fn section_by_name(&self, name: &str) -> Option<&SectionDescriptor> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Find the first section containing RVA
    pub fn section_containing_rva(&self, rva: u32) -> Option<&SectionDescriptor> {
        self.sections.iter().find(|s| s.contains_rva(rva))
    }

    /// Convert RVA to file offset
    #[inline]
    pub fn rva_to_offset(&self, rva: u32) -> Option<u64> {
        rva_to_file_offset(rva, &self.sections)
    }

    /// Like [`rva_to_offset`](Self::rva_to_offset) but as an error for `?` use
    pub fn resolve(&self, rva: u32) -> Result<u64> {
        self.rva_to_offset(rva).ok_or(PeError::UnresolvedRva {
            rva: u64::from(rva),
        })
    }
}

/// Map an RVA to a file offset.
///
/// Linear scan in file order; the first section whose
/// `[virtual_address, virtual_address + virtual_size)` range holds `rva`
/// wins. `None` means no section maps it.
pub fn rva_to_file_offset(rva: u32, sections: &[SectionDescriptor]) -> Option<u64> {
    sections
        .iter()
        .find(|s| s.contains_rva(rva))
        .map(|s| u64::from(rva - s.virtual_address) + u64::from(s.file_pointer))
}

fn section_name_to_string(name: &[u8; 8]) -> String {
    let end = name.iter().position(|&b| b == 0).unwrap_or(8);
    String::from_utf8_lossy(&name[..end]).into_owned()
}

fn parse_section_header(cursor: &mut ByteCursor<'_>) -> Result<SectionDescriptor> {
    let name = section_name_to_string(&cursor.read_bytes::<8>()?);
    let virtual_size = cursor.read_u32()?;
    let virtual_address = cursor.read_u32()?;
    let file_size = cursor.read_u32()?;
    let file_pointer = cursor.read_u32()?;
    // Relocation/line-number pointers and counts, characteristics
    cursor.skip(16)?;

    Ok(SectionDescriptor {
        name,
        virtual_address,
        virtual_size,
        file_pointer,
        file_size,
    })
}

/// Parse `count` section headers starting at `offset`
pub fn parse_section_table(
    cursor: &mut ByteCursor<'_>,
    offset: u64,
    count: u16,
) -> Result<SectionTable> {
    cursor.seek(offset)?;

    // Bound the allocation by what the source can actually hold
    let fits = (cursor.len() - cursor.position()) / SECTION_HEADER_SIZE as usize;
    let mut sections = Vec::with_capacity(usize::from(count).min(fits));

    for _ in 0..count {
        let section = parse_section_header(cursor)?;
        trace!(
            name = %section.name,
            va = format_args!("0x{:x}", section.virtual_address),
            vsize = format_args!("0x{:x}", section.virtual_size),
            raw = format_args!("0x{:x}", section.file_pointer),
            "Parsed section header"
        );
        sections.push(section);
    }

    Ok(SectionTable::new(sections))
}
