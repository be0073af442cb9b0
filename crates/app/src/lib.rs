//! # pillminder-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `MedicineRepository` — the persistent medicine table
//!   - `DeliveryLog` — claimed reminder keys, for exactly-once notification
//!   - `Notifier` — the notification side effect
//!   - `ChangePublisher` — fan-out of change events
//!   - `Clock` — the current time
//! - Define **driving/inbound** use-cases:
//!   - `MedicineService` — validated create, read, update, delete, list
//!   - `ReminderWorker` — the periodic wake that emits due reminders
//!   - `MedicineListView` — cached, subscribable list of entries
//! - Provide **in-process infrastructure** that doesn't need IO (change bus,
//!   work scheduler, in-memory delivery log, report rendering)
//!
//! ## Dependency rule
//! Depends on `pillminder-domain` only (plus `tokio` for channels, locks, and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod delivery_log;
pub mod event_bus;
pub mod ports;
pub mod reminder_worker;
pub mod report;
pub mod services;
#[cfg(test)]
mod testing;
pub mod view_state;
pub mod work_scheduler;
