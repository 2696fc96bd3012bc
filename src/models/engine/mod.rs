pub mod hit_window;
pub mod note;
pub mod note_queue;
pub mod timing;

pub use hit_window::{HitWindow, WindowBand};
pub use note::{Chart, Note, NoteState};
pub use note_queue::NoteQueue;
pub use timing::{AudioClock, ManualClock, SmoothedClock, TimingProvider};

/// Largest supported key mode.
pub const MAX_LANES: usize = 10;
