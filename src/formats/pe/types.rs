//! Core PE data types and structures

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

// PE constants
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const PE_SIGNATURE: u32 = 0x0000_4550; // PE\0\0
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

/// Offset of `e_lfanew` inside the DOS header
pub const DOS_PE_POINTER_OFFSET: u64 = 0x3C;
pub const COFF_HEADER_SIZE: u64 = 20;
pub const SECTION_HEADER_SIZE: u64 = 40;
pub const EXPORT_DIRECTORY_SIZE: u64 = 40;
pub const IMPORT_DESCRIPTOR_SIZE: u64 = 20;

/// Default cap for NUL-terminated string reads
pub const MAX_STRING_LEN: usize = 512;

/// PE parsing error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeError {
    #[error("Invalid DOS signature: 0x{0:04x}")]
    InvalidDosSignature(u16),

    #[error("Invalid PE signature: 0x{0:08x}")]
    InvalidPeSignature(u32),

    #[error("Truncated read at offset 0x{offset:x}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Invalid file offset: 0x{offset:x}")]
    InvalidOffset { offset: u64 },

    #[error("RVA 0x{rva:x} does not map to any section")]
    UnresolvedRva { rva: u64 },
}

pub type Result<T> = std::result::Result<T, PeError>;

/// Machine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Machine {
    I386,    // 0x014c
    X86_64,  // 0x8664
    IA64,    // 0x0200
    Arm,     // 0x01c0
    ArmNT,   // 0x01c4
    Arm64,   // 0xaa64
    Other(u16),
}

impl Machine {
    /// Raw COFF machine code
    pub fn code(self) -> u16 {
        match self {
            Self::I386 => 0x014c,
            Self::X86_64 => 0x8664,
            Self::IA64 => 0x0200,
            Self::Arm => 0x01c0,
            Self::ArmNT => 0x01c4,
            Self::Arm64 => 0xaa64,
            Self::Other(code) => code,
        }
    }

    /// Human-readable architecture label
    pub fn label(self) -> String {
        match self {
            Self::I386 => "x86 (I386)".to_string(),
            Self::X86_64 => "x64 (AMD64)".to_string(),
            Self::IA64 => "IA64".to_string(),
            Self::Arm => "ARM".to_string(),
            Self::ArmNT => "ARMv7 Thumb-2".to_string(),
            Self::Arm64 => "ARM64".to_string(),
            Self::Other(code) => format!("Unknown (0x{:04X})", code),
        }
    }
}

impl From<u16> for Machine {
    fn from(value: u16) -> Self {
        match value {
            0x014c => Self::I386,
            0x8664 => Self::X86_64,
            0x0200 => Self::IA64,
            0x01c0 => Self::Arm,
            0x01c4 => Self::ArmNT,
            0xaa64 => Self::Arm64,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Machine {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

bitflags! {
    /// COFF file header characteristics
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Characteristics: u16 {
        const RELOCS_STRIPPED = 0x0001;
        const EXECUTABLE_IMAGE = 0x0002;
        const LARGE_ADDRESS_AWARE = 0x0020;
        const MACHINE_32BIT = 0x0100;
        const DEBUG_STRIPPED = 0x0200;
        const SYSTEM = 0x1000;
        const DLL = 0x2000;

        const _ = !0;
    }
}

/// COFF header (20 bytes); timestamp and symbol table fields are skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoffHeader {
    pub machine: Machine,
    pub number_of_sections: u16,
    pub size_of_optional_header: u16,
    pub characteristics: Characteristics,
}

impl CoffHeader {
    pub fn is_dll(&self) -> bool {
        self.characteristics.contains(Characteristics::DLL)
    }
}

/// Optional header layout selected by its magic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Pe32,
    Pe32Plus,
}

impl ImageKind {
    /// Anything other than the PE32+ magic is decoded with the PE32 layout.
    pub fn from_magic(magic: u16) -> Self {
        if magic == PE32PLUS_MAGIC {
            Self::Pe32Plus
        } else {
            Self::Pe32
        }
    }

    pub fn is_64bit(self) -> bool {
        matches!(self, Self::Pe32Plus)
    }

    /// Offset of the data directory block from the optional header start
    pub fn data_directory_offset(self) -> u64 {
        match self {
            Self::Pe32 => 96,
            Self::Pe32Plus => 112,
        }
    }

    /// Width of one import lookup table entry
    pub fn thunk_size(self) -> usize {
        match self {
            Self::Pe32 => 4,
            Self::Pe32Plus => 8,
        }
    }

    pub fn ordinal_flag(self) -> u64 {
        match self {
            Self::Pe32 => 0x8000_0000,
            Self::Pe32Plus => 0x8000_0000_0000_0000,
        }
    }
}

/// Data directory entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectory {
    /// A directory is only walked when both RVA and size are set.
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0 && self.size != 0
    }

    pub fn contains(&self, rva: u32) -> bool {
        let start = u64::from(self.virtual_address);
        let end = start + u64::from(self.size);
        (start..end).contains(&u64::from(rva))
    }
}

/// The part of the optional header this crate decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalHeader {
    pub magic: u16,
    pub kind: ImageKind,
    pub export_directory: DataDirectory,
    pub import_directory: DataDirectory,
}

/// Signature, COFF header and optional header summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtHeaders {
    pub pe_offset: u32,
    pub file_header: CoffHeader,
    /// `None` when the COFF header declares an empty optional header
    pub optional_header: Option<OptionalHeader>,
}

impl NtHeaders {
    pub fn optional_header_offset(&self) -> u64 {
        u64::from(self.pe_offset) + 4 + COFF_HEADER_SIZE
    }

    pub fn section_table_offset(&self) -> u64 {
        self.optional_header_offset() + u64::from(self.file_header.size_of_optional_header)
    }

    pub fn is_64bit(&self) -> bool {
        self.optional_header
            .map(|h| h.kind.is_64bit())
            .unwrap_or(false)
    }
}

/// Section header as stored in the section table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub name: String,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub file_pointer: u32,
    pub file_size: u32,
}

impl SectionDescriptor {
    /// Whether `rva` lies in `[virtual_address, virtual_address + virtual_size)`
    #[inline]
    pub fn contains_rva(&self, rva: u32) -> bool {
        let start = u64::from(self.virtual_address);
        let end = start + u64::from(self.virtual_size);
        (start..end).contains(&u64::from(rva))
    }
}

/// One exported symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFunction {
    pub ordinal: u32,
    pub name: Option<String>,
    pub rva: u32,
    /// Set when the RVA points back into the export directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarder: Option<String>,
}

/// One imported symbol, either by name or by ordinal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportedFunction {
    ByName { name: String, hint: u16 },
    ByOrdinal { ordinal: u16 },
}

impl ImportedFunction {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::ByName { name, .. } => Some(name),
            Self::ByOrdinal { .. } => None,
        }
    }

    pub fn ordinal(&self) -> Option<u16> {
        match self {
            Self::ByName { .. } => None,
            Self::ByOrdinal { ordinal } => Some(*ordinal),
        }
    }

    pub fn is_ordinal(&self) -> bool {
        matches!(self, Self::ByOrdinal { .. })
    }
}

/// Imports from a single module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedModule {
    pub name: String,
    pub functions: Vec<ImportedFunction>,
}

/// Limits and switches for directory parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub parse_imports: bool,
    pub parse_exports: bool,
    /// Cap for every NUL-terminated string read
    pub max_string_len: usize,
    pub max_exports: usize,
    pub max_import_modules: usize,
    pub max_imports_per_module: usize,
    /// Bound on imported functions across all modules
    pub max_total_imports: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            parse_imports: true,
            parse_exports: true,
            max_string_len: MAX_STRING_LEN,
            max_exports: 65_536,
            max_import_modules: 4_096,
            max_imports_per_module: 65_536,
            max_total_imports: 262_144,
        }
    }
}
