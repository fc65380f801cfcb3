mod accumulator;
mod history;

pub use accumulator::{SessionAccumulator, SessionData};
pub use history::{
    default_name, effective_name, CompletedSession, Finalized, SessionHistory, SyncOutcome,
    MAX_NAME_CHARS,
};
