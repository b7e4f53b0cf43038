pub mod availability;
pub mod clock;
pub mod hold;
pub mod ledger;
pub mod manager;

pub use availability::{available_quantity, unit_availability, TierAvailability, UnitAvailability};
pub use clock::{Clock, ManualClock, SystemClock};
pub use hold::{Hold, HoldState};
pub use ledger::{HoldLedger, InMemoryLedger, LedgerError};
pub use manager::{ReservationManager, ReserveError};
