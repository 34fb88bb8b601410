//! humtxt - Humdrum Text Format Library
//!
//! This library provides the shared file model for Humdrum symbolic music
//! notation: a tab-separated, spine-based plain-text format for musical
//! scores. It parses multi-spine token streams, tracks spine split/join
//! lineage, resolves null tokens, and computes exact rational beat
//! positions for every line.

pub mod errors;
pub mod file;
pub mod parser;
pub mod rhythm;
pub mod spines;
pub mod stream;
pub mod tempo;
pub mod transforms;
pub mod types;
pub mod util;

// Re-export commonly used types
pub use errors::ModelError;
pub use errors::ParseIssue;
pub use errors::ParseMode;
pub use file::HumdrumFile;
pub use parser::HumdrumParser;
pub use parser::ParseOptions;
pub use parser::parse_humdrum;
pub use rhythm::Measure;
pub use rhythm::RhythmOptions;
pub use stream::HumdrumStream;
pub use tempo::TempoMap;
pub use types::line::Line;
pub use types::line::LineType;
pub use types::rational::Rational;
pub use types::time_signature::TimeSignature;
pub use types::token::Token;
pub use types::token::TokenType;

pub type Result<T> = anyhow::Result<T>;
