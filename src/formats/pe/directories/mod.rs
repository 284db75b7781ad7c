//! Data directory parsers

pub mod export;
pub mod import;

pub use export::parse_exports;
pub use import::parse_imports;
