//! Entry points: analyze a path, an open handle, or a byte slice.
//!
//! The plain `analyze_*` methods never fail loudly: anything that stops the
//! header phase (missing file, bad signature, truncated headers) yields
//! `None`, with the reason logged at debug level. Use the `try_*` methods to
//! get the reason as an [`AnalysisError`].

use std::io::{Read, Seek};
use std::path::Path;

use tracing::{debug, debug_span};

use crate::config::AnalysisOptions;
use crate::error::{AnalysisError, Result};
use crate::formats::pe::PeParser;
use crate::io::ByteSource;
use crate::report::AnalysisResult;

/// Stateless analyzer; one instance can serve any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalysisOptions,
}

fn absorb(path: &Path, result: Result<AnalysisResult>) -> Option<AnalysisResult> {
    match result {
        Ok(result) => Some(result),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Not analyzable");
            None
        }
    }
}

impl Analyzer {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn analyze_path<P: AsRef<Path>>(&self, path: P) -> Option<AnalysisResult> {
        let path = path.as_ref();
        absorb(path, self.try_analyze_path(path))
    }

    pub fn analyze_reader<R: Read + Seek>(
        &self,
        path: impl AsRef<Path>,
        reader: &mut R,
    ) -> Option<AnalysisResult> {
        let path = path.as_ref();
        absorb(path, self.try_analyze_reader(path, reader))
    }

    /// `path` only fills the `file_path`/`file_name` fields
    pub fn analyze_bytes(&self, path: impl AsRef<Path>, data: &[u8]) -> Option<AnalysisResult> {
        let path = path.as_ref();
        absorb(path, self.try_analyze_bytes(path, data))
    }

    pub fn try_analyze_path<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisResult> {
        let source = ByteSource::open(path.as_ref(), &self.options.io)?;
        self.try_analyze_bytes(source.path(), source.as_bytes())
    }

    pub fn try_analyze_reader<R: Read + Seek>(
        &self,
        path: impl AsRef<Path>,
        reader: &mut R,
    ) -> Result<AnalysisResult> {
        let source = ByteSource::from_reader(path.as_ref(), reader, &self.options.io)?;
        self.try_analyze_bytes(source.path(), source.as_bytes())
    }

    pub fn try_analyze_bytes(
        &self,
        path: impl AsRef<Path>,
        data: &[u8],
    ) -> Result<AnalysisResult> {
        let path = path.as_ref();
        let span = debug_span!("analyze", path = %path.display(), size = data.len());
        let _guard = span.enter();

        let parser = PeParser::with_options(data, self.options.parse.clone())
            .map_err(AnalysisError::from)?;
        let machine = parser.machine();
        let is_64bit = parser.is_64bit();
        let is_dll = parser.is_dll();
        let (exports, imports) = parser.into_tables();

        debug!(
            %machine,
            is_64bit,
            is_dll,
            exports = exports.len(),
            import_modules = imports.len(),
            "Analysis complete"
        );

        Ok(AnalysisResult::new(
            path, machine, is_64bit, is_dll, exports, imports,
        ))
    }
}

/// Analyze a file with default options
pub fn analyze_path<P: AsRef<Path>>(path: P) -> Option<AnalysisResult> {
    Analyzer::default().analyze_path(path)
}

/// Analyze an in-memory image with default options
pub fn analyze_bytes(path: impl AsRef<Path>, data: &[u8]) -> Option<AnalysisResult> {
    Analyzer::default().analyze_bytes(path, data)
}
