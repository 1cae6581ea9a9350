//! Real-time store adapters (Firebase Realtime Database, in-memory, unconfigured)

pub mod firebase;
pub mod handle;
pub mod memory;
pub mod path;
pub mod sse;
pub mod traits;
pub mod unconfigured;

pub use firebase::FirebaseStore;
pub use handle::*;
pub use memory::MemoryStore;
pub use path::{LedPaths, StorePath};
pub use traits::*;
pub use unconfigured::UnconfiguredStore;
