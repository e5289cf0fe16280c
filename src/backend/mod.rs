//! Wallet backend boundary.
//!
//! The backend is an external collaborator: every call may fail
//! independently, and all failures are caught at the fetcher boundary.

mod backend_mock;
mod backend_model;
mod backend_traits;

pub use backend_mock::MockWalletBackend;
pub use backend_model::RawHolding;
pub use backend_traits::WalletBackend;
