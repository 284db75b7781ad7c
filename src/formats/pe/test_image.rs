//! Synthetic PE images for tests.
//!
//! Self-contained so the integration tests can share it through `#[path]`.

pub const PE_OFFSET: usize = 0x80;

pub struct Section {
    pub name: &'static str,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub file_pointer: u32,
    pub data: Vec<u8>,
}

/// Little-endian byte writer
#[derive(Default)]
pub struct Blob {
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn cstr(&mut self, value: &str) -> &mut Self {
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.push(0);
        self
    }

    pub fn put_u32(&mut self, at: u32, value: u32) {
        let at = at as usize;
        self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}

pub struct ImageBuilder {
    pub machine: u16,
    pub characteristics: u16,
    pub pe32_plus: bool,
    /// Declare a zero-sized optional header and write none
    pub no_optional_header: bool,
    pub export_directory: (u32, u32),
    pub import_directory: (u32, u32),
    pub sections: Vec<Section>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self {
            machine: 0x014c,
            characteristics: 0x0102,
            pe32_plus: false,
            no_optional_header: false,
            export_directory: (0, 0),
            import_directory: (0, 0),
            sections: Vec::new(),
        }
    }
}

impl ImageBuilder {
    pub fn section(mut self, name: &'static str, va: u32, file_pointer: u32, data: Vec<u8>) -> Self {
        let virtual_size = (data.len() as u32).max(0x100);
        self.sections.push(Section {
            name,
            virtual_address: va,
            virtual_size,
            file_pointer,
            data,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let optional_size: usize = match (self.no_optional_header, self.pe32_plus) {
            (true, _) => 0,
            (false, true) => 0xF0,
            (false, false) => 0xE0,
        };
        let optional_offset = PE_OFFSET + 24;
        let section_table = optional_offset + optional_size;
        let headers_end = section_table + self.sections.len() * 40;
        let end = self
            .sections
            .iter()
            .map(|s| s.file_pointer as usize + s.data.len())
            .fold(headers_end, usize::max);

        let mut out = vec![0u8; end];
        let put16 = |out: &mut Vec<u8>, at: usize, v: u16| {
            out[at..at + 2].copy_from_slice(&v.to_le_bytes())
        };
        let put32 = |out: &mut Vec<u8>, at: usize, v: u32| {
            out[at..at + 4].copy_from_slice(&v.to_le_bytes())
        };

        put16(&mut out, 0, 0x5A4D);
        put32(&mut out, 0x3C, PE_OFFSET as u32);
        put32(&mut out, PE_OFFSET, 0x0000_4550);
        put16(&mut out, PE_OFFSET + 4, self.machine);
        put16(&mut out, PE_OFFSET + 6, self.sections.len() as u16);
        put16(&mut out, PE_OFFSET + 20, optional_size as u16);
        put16(&mut out, PE_OFFSET + 22, self.characteristics);

        if optional_size != 0 {
            let magic = if self.pe32_plus { 0x20B } else { 0x10B };
            put16(&mut out, optional_offset, magic);
            let dirs = optional_offset + if self.pe32_plus { 112 } else { 96 };
            put32(&mut out, dirs, self.export_directory.0);
            put32(&mut out, dirs + 4, self.export_directory.1);
            put32(&mut out, dirs + 8, self.import_directory.0);
            put32(&mut out, dirs + 12, self.import_directory.1);
        }

        for (i, s) in self.sections.iter().enumerate() {
            let at = section_table + i * 40;
            let name = s.name.as_bytes();
            out[at..at + name.len()].copy_from_slice(name);
            put32(&mut out, at + 8, s.virtual_size);
            put32(&mut out, at + 12, s.virtual_address);
            put32(&mut out, at + 16, s.data.len() as u32);
            put32(&mut out, at + 20, s.file_pointer);
            let start = s.file_pointer as usize;
            out[start..start + s.data.len()].copy_from_slice(&s.data);
        }

        out
    }
}

/// Export directory laid out at the start of a section based at `va`.
///
/// `functions` are RVAs in slot order; `names` pair a name with a slot index.
/// Returns the section contents and the directory size.
pub fn export_section(
    va: u32,
    ordinal_base: u32,
    functions: &[u32],
    names: &[(&str, u16)],
) -> (Vec<u8>, u32) {
    let mut blob = Blob::default();
    let functions_at = 40;
    let names_at = functions_at + 4 * functions.len() as u32;
    let ordinals_at = names_at + 4 * names.len() as u32;

    blob.u32(0).u32(0).u32(0).u32(0); // characteristics, timestamp, versions, name
    blob.u32(ordinal_base)
        .u32(functions.len() as u32)
        .u32(names.len() as u32)
        .u32(va + functions_at)
        .u32(va + names_at)
        .u32(va + ordinals_at);
    for &rva in functions {
        blob.u32(rva);
    }
    let name_slots = blob.len();
    for _ in names {
        blob.u32(0);
    }
    for &(_, index) in names {
        blob.u16(index);
    }
    for (i, &(name, _)) in names.iter().enumerate() {
        let rva = va + blob.len();
        blob.put_u32(name_slots + 4 * i as u32, rva);
        blob.cstr(name);
    }

    let size = blob.len();
    (blob.bytes, size)
}

pub enum Thunk {
    Name(u16, &'static str),
    Ordinal(u16),
}

/// Import directory laid out at the start of a section based at `va`.
///
/// With `iat_only` the lookup-table RVA is left zero and the thunks are only
/// reachable through the address-table RVA.
pub fn import_section(
    va: u32,
    pe32_plus: bool,
    iat_only: bool,
    modules: &[(&str, Vec<Thunk>)],
) -> (Vec<u8>, u32) {
    let mut blob = Blob::default();
    let descriptors = 20 * (modules.len() as u32 + 1);
    blob.bytes.resize(descriptors as usize, 0);

    for (m, (name, thunks)) in modules.iter().enumerate() {
        let table_rva = va + blob.len();
        let table_at = blob.len();
        for _ in 0..=thunks.len() {
            if pe32_plus {
                blob.u64(0);
            } else {
                blob.u32(0);
            }
        }

        for (i, thunk) in thunks.iter().enumerate() {
            let entry: u64 = match thunk {
                Thunk::Ordinal(ordinal) => {
                    let flag = if pe32_plus { 1u64 << 63 } else { 1u64 << 31 };
                    flag | u64::from(*ordinal)
                }
                Thunk::Name(hint, name) => {
                    let rva = va + blob.len();
                    blob.u16(*hint).cstr(name);
                    u64::from(rva)
                }
            };
            let width = if pe32_plus { 8 } else { 4 };
            let at = (table_at + width * i as u32) as usize;
            blob.bytes[at..at + width as usize]
                .copy_from_slice(&entry.to_le_bytes()[..width as usize]);
        }

        let name_rva = va + blob.len();
        blob.cstr(name);

        let d = 20 * m as u32;
        blob.put_u32(d, if iat_only { 0 } else { table_rva });
        blob.put_u32(d + 12, name_rva);
        blob.put_u32(d + 16, table_rva);
    }

    let size = blob.len();
    (blob.bytes, size)
}
