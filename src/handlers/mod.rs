pub mod health;
pub mod load_project;
pub mod heartbeat;
pub mod project_content;
pub mod save_project;
pub mod create_project;
pub mod library;
pub mod visibility;

pub use health::*;
pub use load_project::*;
pub use heartbeat::*;
pub use project_content::*;
pub use save_project::*;
pub use create_project::*;
pub use library::*;
pub use visibility::*;
