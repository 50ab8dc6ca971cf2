// Listener-side sync: periodic polling plus drift reconciliation

pub mod poller;
pub mod reconciler;

pub use poller::{PollEvent, SyncPoller};
pub use reconciler::{ReconcileOutcome, Reconciler, SyncPhase};
