// Public API - what other modules can use
pub use router::RoomRouter;

// Internal modules
mod router;
