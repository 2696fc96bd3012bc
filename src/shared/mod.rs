pub mod snapshot;

pub use snapshot::GameplaySnapshot;
