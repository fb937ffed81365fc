// Real-time delivery to individual users
//
// Services that need to notify a user receive an EventDispatcher at
// construction time instead of reaching for a global socket handle.

// Public API - what other modules can use
pub use dispatcher::EventDispatcher;

// Internal modules
mod dispatcher;
