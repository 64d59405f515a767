pub mod combinator;
pub mod constraints;
pub mod executor;
pub mod extractor;
pub mod orchestrator;
pub mod ranking;
pub mod resolver;

pub use combinator::CombinatorEngine;
pub use constraints::constraint_holds;
pub use executor::PatternExecutor;
pub use extractor::{enforce_budget, SubgraphExtractor};
pub use orchestrator::RetrievalOrchestrator;
pub use ranking::PathRanker;
pub use resolver::{EntryPointResolver, ResolverOptions};
