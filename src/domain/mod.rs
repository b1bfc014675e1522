//! Domain layer: fund records, block payloads, reservations and fan-out.
//!
//! This module holds the two concurrent cores of the gateway: the
//! [`ReservationManager`] that keeps concurrent spends from selecting the
//! same funds, and the [`Hub`] that fans block events out to WebSocket
//! subscribers.

pub mod block;
pub mod fund;
pub mod hub;
pub mod reservation;

pub use block::{BlockData, BlockEvent};
pub use fund::{FundId, FundRecord};
pub use hub::{Connection, ConnectionId, Hub};
pub use reservation::{
    ConsolidationOutcome, LeaseId, ReservationManager, ReservationPolicy, ReservedSet,
};
