//! Application layer
//!
//! Player sessions and the requests they can make

pub mod player_controller;
pub mod requests;

pub use player_controller::PlayerController;
pub use requests::{Request, RequestData, RequestRegistry};
