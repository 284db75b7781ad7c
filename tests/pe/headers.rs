use pesym::{analyze_bytes, Machine};

use crate::common::PeImage;

#[test]
fn zero_buffer_is_not_an_image() {
    assert!(analyze_bytes("zero.bin", &[0u8; 10]).is_none());
    assert!(analyze_bytes("empty.bin", &[]).is_none());
}

#[test]
fn missing_mz_is_rejected() {
    let mut data = PeImage::pe32().build();
    data[0] = b'Z';
    assert!(analyze_bytes("bad.exe", &data).is_none());
}

#[test]
fn bad_pe_signature_is_rejected() {
    let mut data = PeImage::pe32().build();
    data[0x80..0x84].copy_from_slice(b"NE\0\0");
    assert!(analyze_bytes("bad.exe", &data).is_none());
}

#[test]
fn e_lfanew_past_end_is_rejected() {
    let mut data = PeImage::pe32().build();
    data[0x3C..0x40].copy_from_slice(&0x10_0000u32.to_le_bytes());
    assert!(analyze_bytes("bad.exe", &data).is_none());
}

#[test]
fn truncated_coff_header_is_rejected() {
    let data = PeImage::pe32().build();
    assert!(analyze_bytes("short.exe", &data[..0x80 + 10]).is_none());
}

#[test]
fn executable_is_not_dll() {
    let result = analyze_bytes("app.exe", &PeImage::pe32().build()).unwrap();
    assert!(!result.is_dll());
    assert!(!result.is_64bit());
    assert_eq!(result.machine(), Machine::I386);
}

#[test]
fn dll_characteristic_is_reported() {
    let result = analyze_bytes("lib.dll", &PeImage::pe32().dll().build()).unwrap();
    assert!(result.is_dll());
}

#[test]
fn pe32_plus_is_64bit() {
    let image = PeImage::pe32_plus()
        .dll()
        .section(".text", vec![0xC3; 0x10])
        .exports(1, &[0x1000], &[("Foo", 0)]);
    let result = analyze_bytes("x64.dll", &image.build()).unwrap();

    assert!(result.is_64bit());
    assert_eq!(result.machine(), Machine::X86_64);
    // Directories are read at +112 for PE32+
    assert_eq!(result.exports().len(), 1);
    assert_eq!(result.exports()[0].name.as_deref(), Some("Foo"));
}

#[test]
fn unknown_machine_is_kept() {
    let image = PeImage::pe32().machine(0x5032);
    let result = analyze_bytes("riscv.exe", &image.build()).unwrap();
    assert_eq!(result.machine(), Machine::Other(0x5032));
    assert_eq!(result.machine().to_string(), "Unknown (0x5032)");
}

#[test]
fn no_optional_header_means_no_tables() {
    let image = PeImage::pe32()
        .dll()
        .section(".text", vec![0xC3; 0x10])
        .exports(1, &[0x1000], &[("Foo", 0)])
        .imports(&[])
        .without_optional_header();
    let result = analyze_bytes("bare.dll", &image.build()).unwrap();

    assert!(result.is_dll());
    assert!(result.exports().is_empty());
    assert!(result.imports().is_empty());
}
