pub mod crossref;
pub mod google_scholar;
pub mod ieee_xplore;
pub mod science_direct;
pub mod semantic_scholar;
pub mod traits;

pub use crossref::CrossRefProvider;
pub use google_scholar::{GoogleScholarProvider, ScholarCursor, ScholarEntry};
pub use ieee_xplore::IeeeXploreProvider;
pub use science_direct::ScienceDirectProvider;
pub use semantic_scholar::SemanticScholarProvider;
pub use traits::{ProviderError, ProviderOutcome, SearchQuery, SourceProvider};
