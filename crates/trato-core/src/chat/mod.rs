//! Per-conversation messaging: store, reconciler, and the engine actor that
//! funnels the three delivery sources through one serialized entry point.

pub mod engine;
pub mod reconcile;
pub mod store;

pub use engine::{ChatBackend, ChatClient, ChatEvent, ChatHandle, ChatSnapshot};
pub use reconcile::{reconcile, DeliverySource, ReconcileOutcome, RECENT_ECHO_WINDOW_SECS};
pub use store::MessageStore;
