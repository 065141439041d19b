//! Output formatters for scan and merge results.
//!
//! - [`json`] for scripting (`--json`)
//! - [`text`] for terminals
//!
//! ```no_run
//! use dupmerge::duplicates::DuplicateFinder;
//! use dupmerge::error::ExitCode;
//! use dupmerge::output::JsonOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.scan(Path::new(".")).unwrap();
//!
//! let output = JsonOutput::new(&groups, &summary, ExitCode::Success);
//! output.write_to(&mut std::io::stdout()).unwrap();
//! ```

pub mod json;
pub mod text;

pub use json::{JsonDuplicateGroup, JsonMergeOutput, JsonOutput, JsonOutputError, JsonSummary};
