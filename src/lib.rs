pub mod configs;
pub mod error;
pub mod escape;
pub mod ingest;
pub mod normalize;
pub mod runtime;
pub mod source;
pub mod types;
pub mod uslm;

pub use error::ParseError;
pub use types::{ParseStats, ParsedSection};
pub use uslm::UslmParser;
