//! Real-time dispatch pipeline: classification, opt-out filtering, entity
//! resolution, and subscriber fan-out for push message batches.

mod classifier;
mod dispatcher;
mod events;
mod filter;

pub use classifier::{Classification, classify};
pub use dispatcher::{Diagnostic, DiagnosticHook, MessageDispatcher};
pub use events::{Listener, ResolvedEvent, SubscriberRegistry, Subscription};
pub use filter::IgnoredStreams;
