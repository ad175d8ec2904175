pub mod emitter;
pub mod mirror;
pub mod notify;
pub mod runner;
pub mod search;
pub mod worker;

pub use emitter::{EmitError, RequestEmitter};
pub use mirror::{mirror_change, ChangeEvent, ChangeKind, MirrorOutcome};
pub use notify::{
    DeliveryError, Email, EmailTransport, HttpEmailTransport, InMemoryEmailTransport, MessageId,
    Notifier,
};
pub use runner::{PollPolicy, WorkerRunner};
pub use search::{
    HttpSearchIndex, InMemorySearchIndex, SearchError, SearchHits, SearchIndex,
};
pub use worker::{ProcessOutcome, SuggestionWorker, WorkerError};
