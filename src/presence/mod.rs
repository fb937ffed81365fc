// Public API - what other modules can use
pub use registry::{InMemoryPresenceRegistry, PresenceRegistry};

// Internal modules
mod registry;
