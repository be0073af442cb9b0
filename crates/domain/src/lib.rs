//! # pillminder-domain
//!
//! Pure domain model for the pillminder medicine reminder system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Medicine entries** (what to take, how much, when)
//! - Define **Schedules** (daily, weekly, interval, and meal-time rules)
//! - Define **Reminder events** (derived "entry is due at T" values, never stored)
//! - Define **Medicine events** (change notifications published after writes)
//! - Evaluate schedules into concrete due timestamps
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod dosage;
pub mod evaluator;
pub mod event;
pub mod medicine;
pub mod reminder;
pub mod schedule;
