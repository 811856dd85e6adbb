pub mod catalog;
pub mod sink;

pub use catalog::{filter_candidates, CandidateOrdering, CandidateStream, FilterOptions, ImageCatalog};
pub use sink::CompositeSink;
