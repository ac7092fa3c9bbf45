pub mod foam_parser;

// Re-export the main parsing entry points for convenience
pub use foam_parser::{parse_foam_text, parse_foam_value, FoamHeader, ParsedFoamFile};
