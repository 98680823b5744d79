pub mod workshop_client;

pub use workshop_client::{resolve_token, HttpProjectApi};
