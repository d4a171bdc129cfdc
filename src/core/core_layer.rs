// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "streams/mod.rs"]
pub mod streams;

#[path = "snipe/mod.rs"]
pub mod snipe;
