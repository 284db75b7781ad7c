//! Export and import table inspection for Windows PE images.
//!
//! ```no_run
//! let result = pesym::analyze_path("C:/Windows/System32/kernel32.dll").expect("not a PE image");
//! for export in result.exports() {
//!     println!("{:>5} {}", export.ordinal, export.name.as_deref().unwrap_or("<unnamed>"));
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod formats;
pub mod io;
pub mod logging;
pub mod report;

pub use api::{analyze_bytes, analyze_path, Analyzer};
pub use config::AnalysisOptions;
pub use error::{AnalysisError, ConfigError};
pub use formats::pe::{
    rva_to_file_offset, ExportedFunction, ImportedFunction, ImportedModule, Machine,
    ParseOptions, SectionDescriptor,
};
pub use report::AnalysisResult;
