pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, SmokingData, load_config, load_profiles, load_smoking_data};
