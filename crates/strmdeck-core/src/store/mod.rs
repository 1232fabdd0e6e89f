// ── Reactive state store ──
//
// Client-side mirror of server state with push-based change notification.

mod collection;
mod reconcile;
mod state_store;

pub use state_store::StateStore;
