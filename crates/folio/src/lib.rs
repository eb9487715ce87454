pub mod config;
pub mod error;
pub mod images;
pub mod loader;
pub mod parsing;
pub mod schema;
pub mod types;

pub use config::*;
pub use error::*;
pub use images::*;
pub use loader::*;
pub use parsing::*;
pub use schema::*;
pub use types::*;
