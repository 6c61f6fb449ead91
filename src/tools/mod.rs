pub mod http;
pub mod misc;
pub mod registry;
pub mod traits;
pub mod validate;

pub use registry::ToolRegistry;
pub use traits::{CallableTool, ToolOutcome};
