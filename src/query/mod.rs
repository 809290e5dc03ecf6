// Query module for the pattern query engine
//
// This module provides the complete query processing pipeline:
// - Parsing query strings into an AST and planning them against a graph
// - Depth-first pattern matching, single-threaded or parallel
// - Grouping, aggregation and ordering of the matches
// - Printing evaluated results

// Sub-modules
pub mod comparer;
pub mod executor;
pub mod grouper;
pub mod matcher;
pub mod parser;
pub mod plan;
pub mod printer;
pub mod results;
pub mod sorter;

// Re-export commonly used types for convenience
pub use crate::core::{DBResult, QueryError};
pub use executor::{Query, QueryResults, ResultSet};
pub use plan::{QueryPlan, VariableKind, VariableMap};
pub use printer::{format_results, PrintFormat};
