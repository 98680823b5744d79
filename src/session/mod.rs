//! Client side of the editing protocol: which project a tab has open, whether
//! it may edit, and getting its content back to the server.

pub mod access;
pub mod api;
pub mod autosave;
pub mod controller;
pub mod error;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use access::{AccessState, AccessTransition};
pub use api::{ProjectApi, SaveChunk};
pub use autosave::{split_chunks, AutosaveScheduler, AutosaveSettings, SessionContext};
pub use controller::{SessionController, SessionSettings};
pub use error::{ApiError, SessionError};
pub use surface::{EditorSurface, Notice};
