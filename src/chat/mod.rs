//! Chat core: messages, the typing reveal and the engine that drives a turn.

pub mod engine;
pub mod message;
pub mod reveal;
pub mod ticker;

pub use engine::{ChatEngine, ChatEvent, EngineStatus, SubmitOutcome};
pub use message::{Message, Role};
pub use reveal::{Reveal, RevealPhase, RevealStep};
pub use ticker::{InstantTicker, Ticker, TokioTicker};
