mod loader;
mod schema;

pub use loader::{load_default_config, load_config};
pub use schema::AppConfig;
