//! Background Tasks Module
//!
//! Delayed tasks that run alongside the in-memory backend.

mod expiry;

pub use expiry::spawn_expiry_task;
