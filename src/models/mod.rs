pub mod health;
pub mod error;
pub mod library;
pub mod project;
pub mod visibility;

pub use health::*;
pub use error::*;
pub use library::*;
pub use project::*;
pub use visibility::*;
