//! Out-of-band wallet signals consumed by the asset session.

mod wallet_event;

pub use wallet_event::WalletEvent;
