pub mod anthropic;
pub mod events;

pub use events::{NormalizedEvent, ProviderEvent, UsageSnapshot};
