//! Notification processing: prompt rendering, timestamps and the per-batch dispatcher

mod clock;
mod dispatcher;
mod prompt;

pub use clock::{Clock, SteppingClock, SystemClock};
pub use dispatcher::{BatchOutcome, DocumentDispatcher, WrittenRecord};
pub use prompt::PromptTemplate;
