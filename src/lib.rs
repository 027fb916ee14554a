//! Wmdbtrigger - publish wafer-map change events from the wmdb.
//!
//! When a wafer map is created, updated, or deleted in the wafer-map
//! database, this crate builds a small structured event, renders it to the
//! fixed XML schema downstream consumers expect, and publishes it to one or
//! more message-queue endpoint groups.

pub mod bus;
pub mod config;
pub mod event;
pub mod trigger;
pub mod wire;

pub use bus::{BusError, Connector, DeliveryPlan, Endpoint, EndpointGroup, Session};
pub use config::TriggerConfig;
pub use event::{Event, EventKind, Wmdb};
pub use trigger::{deliver, deliver_single, DeliveryReport};
