// Chronicle processing engine
//
// Stateless orchestration over the event log: read the stream, ask the
// next-step projection what to do, execute that step, append the result, and
// go around again. No state survives outside the stream: a crashed pass is
// resumed by any later pass reading the same events.

pub mod cancel;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
mod steps;

pub use cancel::CancellationFlag;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
