//! Application services. Each owns one family of invariants and receives its
//! store handle at construction.
pub mod inventory;
pub mod orders;
pub mod reviews;

pub use inventory::InventoryLedger;
pub use orders::{OrderLifecycleManager, SalesSummary};
pub use reviews::ReviewAggregator;
