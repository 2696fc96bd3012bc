//! Play session state.
//!
//! - `GameSession` - Active gameplay: clock, engine, score and replay

pub mod game;

pub use game::GameSession;
