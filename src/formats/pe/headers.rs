//! PE header parsing

use tracing::{debug, trace};

use crate::formats::pe::cursor::ByteCursor;
use crate::formats::pe::types::*;

/// Validate the DOS stub and return `e_lfanew`, the PE header offset
pub fn parse_dos_header(cursor: &mut ByteCursor<'_>) -> Result<u32> {
    cursor.seek(0)?;
    let e_magic = cursor.read_u16()?;
    if e_magic != DOS_SIGNATURE {
        return Err(PeError::InvalidDosSignature(e_magic));
    }

    cursor.seek(DOS_PE_POINTER_OFFSET)?;
    cursor.read_u32()
}

/// Parse the COFF header at the cursor position
pub fn parse_coff_header(cursor: &mut ByteCursor<'_>) -> Result<CoffHeader> {
    let machine = Machine::from(cursor.read_u16()?);
    let number_of_sections = cursor.read_u16()?;
    // TimeDateStamp, PointerToSymbolTable, NumberOfSymbols
    cursor.skip(12)?;
    let size_of_optional_header = cursor.read_u16()?;
    let characteristics = Characteristics::from_bits_retain(cursor.read_u16()?);

    Ok(CoffHeader {
        machine,
        number_of_sections,
        size_of_optional_header,
        characteristics,
    })
}

fn parse_data_directory(cursor: &mut ByteCursor<'_>) -> Result<DataDirectory> {
    Ok(DataDirectory {
        virtual_address: cursor.read_u32()?,
        size: cursor.read_u32()?,
    })
}

/// Parse the optional header magic and the export/import directory entries
pub fn parse_optional_header(cursor: &mut ByteCursor<'_>, offset: u64) -> Result<OptionalHeader> {
    cursor.seek(offset)?;
    let magic = cursor.read_u16()?;
    let kind = ImageKind::from_magic(magic);

    cursor.seek(offset + kind.data_directory_offset())?;
    let export_directory = parse_data_directory(cursor)?;
    let import_directory = parse_data_directory(cursor)?;

    trace!(
        magic = format_args!("0x{:x}", magic),
        ?kind,
        ?export_directory,
        ?import_directory,
        "Parsed optional header"
    );

    Ok(OptionalHeader {
        magic,
        kind,
        export_directory,
        import_directory,
    })
}

/// Parse NT headers (PE signature + COFF + Optional)
pub fn parse_nt_headers(cursor: &mut ByteCursor<'_>) -> Result<NtHeaders> {
    let pe_offset = parse_dos_header(cursor)?;

    cursor.seek(u64::from(pe_offset))?;
    let signature = cursor.read_u32()?;
    if signature != PE_SIGNATURE {
        return Err(PeError::InvalidPeSignature(signature));
    }

    let file_header = parse_coff_header(cursor)?;
    debug!(
        machine = %file_header.machine,
        sections = file_header.number_of_sections,
        optional_header_size = file_header.size_of_optional_header,
        characteristics = format_args!("0x{:04x}", file_header.characteristics.bits()),
        "Parsed COFF header"
    );

    let mut headers = NtHeaders {
        pe_offset,
        file_header,
        optional_header: None,
    };

    if file_header.size_of_optional_header != 0 {
        headers.optional_header = Some(parse_optional_header(
            cursor,
            headers.optional_header_offset(),
        )?);
    }

    Ok(headers)
}
