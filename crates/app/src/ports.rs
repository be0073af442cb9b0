//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod clock;
pub mod delivery_log;
pub mod event_bus;
pub mod notifier;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery_log::DeliveryLog;
pub use event_bus::ChangePublisher;
pub use notifier::{Notifier, NotifyError};
pub use storage::MedicineRepository;
