#![no_main]
use libfuzzer_sys::fuzz_target;
use pesym::{rva_to_file_offset, SectionDescriptor};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let rva = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let sections: Vec<SectionDescriptor> = data[4..]
        .chunks_exact(16)
        .map(|c| SectionDescriptor {
            name: String::new(),
            virtual_address: u32::from_le_bytes([c[0], c[1], c[2], c[3]]),
            virtual_size: u32::from_le_bytes([c[4], c[5], c[6], c[7]]),
            file_pointer: u32::from_le_bytes([c[8], c[9], c[10], c[11]]),
            file_size: u32::from_le_bytes([c[12], c[13], c[14], c[15]]),
        })
        .collect();
    let _ = rva_to_file_offset(rva, &sections);
});
