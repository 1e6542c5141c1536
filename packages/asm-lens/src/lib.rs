// Crate root: declare modules and control visibility
pub mod disasm;
pub mod error;
pub mod executable;
pub mod lines;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod report;
pub mod section;
pub mod source;
pub mod symbols;
pub mod utils;
pub mod view;

// Re-export commonly used API from the library for binaries/tests
pub use error::{Error, ErrorKind, Result};
pub use executable::Executable;
pub use matcher::{build_output, Options};
pub use model::{Block, Instruction, Match, Output, SourceWindow};
pub use view::{ViewConfig, ViewState};
