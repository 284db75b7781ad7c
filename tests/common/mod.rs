//! Common test utilities and helpers.
//!
//! [`PeImage`] places sections automatically on top of the crate's own
//! unit-test image builder, so both test suites share one PE layout.

use std::io::Write;

use tempfile::NamedTempFile;

#[allow(dead_code)]
#[path = "../../src/formats/pe/test_image.rs"]
mod test_image;

pub use test_image::Thunk;
use test_image::{export_section, import_section, ImageBuilder};

const FIRST_FILE_POINTER: u32 = 0x400;
const FILE_ALIGNMENT: u32 = 0x200;

/// Creates a temporary file with the given content.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file
}

/// In-memory PE image.
///
/// Sections get consecutive 0x1000-aligned RVAs starting at 0x1000 and
/// consecutive file-aligned offsets starting at 0x400.
pub struct PeImage {
    builder: ImageBuilder,
    next_file_pointer: u32,
}

impl PeImage {
    pub fn pe32() -> Self {
        Self {
            builder: ImageBuilder::default(),
            next_file_pointer: FIRST_FILE_POINTER,
        }
    }

    pub fn pe32_plus() -> Self {
        let mut image = Self::pe32();
        image.builder.machine = 0x8664;
        image.builder.characteristics = 0x0022;
        image.builder.pe32_plus = true;
        image
    }

    pub fn dll(mut self) -> Self {
        self.builder.characteristics |= 0x2000;
        self
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.builder.machine = machine;
        self
    }

    pub fn without_optional_header(mut self) -> Self {
        self.builder.no_optional_header = true;
        self
    }

    pub fn export_directory(mut self, rva: u32, size: u32) -> Self {
        self.builder.export_directory = (rva, size);
        self
    }

    pub fn import_directory(mut self, rva: u32, size: u32) -> Self {
        self.builder.import_directory = (rva, size);
        self
    }

    fn next_rva(&self) -> u32 {
        0x1000 * (self.builder.sections.len() as u32 + 1)
    }

    pub fn section(mut self, name: &'static str, data: Vec<u8>) -> Self {
        let va = self.next_rva();
        let file_pointer = self.next_file_pointer;
        let raw_size = (data.len() as u32).div_ceil(FILE_ALIGNMENT).max(1) * FILE_ALIGNMENT;
        self.next_file_pointer += raw_size;
        self.builder = self.builder.section(name, va, file_pointer, data);
        self
    }

    /// Add an `.edata` section; `names` pair a name with a slot index.
    pub fn exports(self, ordinal_base: u32, functions: &[u32], names: &[(&str, u16)]) -> Self {
        let va = self.next_rva();
        let (edata, size) = export_section(va, ordinal_base, functions, names);
        self.section(".edata", edata).export_directory(va, size)
    }

    pub fn imports(self, modules: &[(&str, Vec<Thunk>)]) -> Self {
        let va = self.next_rva();
        let pe32_plus = self.builder.pe32_plus;
        let (idata, size) = import_section(va, pe32_plus, false, modules);
        self.section(".idata", idata).import_directory(va, size)
    }

    pub fn build(&self) -> Vec<u8> {
        self.builder.build()
    }
}
