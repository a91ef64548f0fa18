pub mod export;
pub mod search;

pub use export::ExportFormat;
pub use search::{SearchOutput, SearchTool};
