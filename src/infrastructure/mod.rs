pub mod pattern_extractor;
pub mod scanner;

pub use pattern_extractor::{Match, PatternExtractor, Target};
