pub mod cache;
pub mod config;
pub mod record;
pub mod status;

pub use cache::*;
pub use config::*;
pub use record::*;
pub use status::*;
