#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(result) = pesym::analyze_bytes("<fuzz>", data) {
        let _ = result.import_hash();
    }
});
