//! Lane input events as delivered by the keyboard layer.

pub mod events;

pub use events::{InputEvent, InputKind};
