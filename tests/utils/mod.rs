pub mod actions;
pub mod assertions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{MessageAssertion, MessageContent};
#[allow(unused_imports)]
pub use mocks::{MockConnectionManager, ScriptedClient, ScriptedSocket};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
