//! Delivery transport for wafer-map events.
//!
//! This module contains:
//! - `Connector` / `Session` traits: the messaging collaborator boundary
//! - Endpoint and plan types describing where to deliver
//! - Implementations: STOMP (feature `stomp`), Mock

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

// Implementation modules
pub mod mock;
#[cfg(feature = "stomp")]
pub mod stomp;

// Re-exports
pub use mock::{MockCall, MockConnector};
#[cfg(feature = "stomp")]
pub use stomp::{StompConfig, StompConnector};

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur while talking to a broker.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Publish failed: {0}")]
    Publish(String),
}

/// One broker address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Failover alternatives for one logical broker connection.
///
/// Members are interchangeable; a connector picks one reachable member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointGroup {
    pub endpoints: Vec<Endpoint>,
}

impl EndpointGroup {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    /// Group with a single member (no failover).
    pub fn single(host: impl Into<String>, port: u16) -> Self {
        Self {
            endpoints: vec![Endpoint::new(host, port)],
        }
    }
}

/// Ordered endpoint groups, each independently attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub groups: Vec<EndpointGroup>,
}

impl DeliveryPlan {
    pub fn new(groups: Vec<EndpointGroup>) -> Self {
        Self { groups }
    }

    /// Plan with one implicit single-member group.
    pub fn single(host: impl Into<String>, port: u16) -> Self {
        Self {
            groups: vec![EndpointGroup::single(host, port)],
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// An open broker session, exclusively owned for one
/// connect -> publish -> close cycle.
#[async_trait]
pub trait Session: Send {
    /// Publish a message body to a destination on the broker.
    async fn send(&mut self, destination: &str, body: &[u8]) -> Result<()>;

    /// Release the session. Called on every exit path, publish failure
    /// included.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions against an endpoint group.
///
/// Implementations own member selection within a group; callers treat the
/// group as one logical broker.
///
/// Implementations:
/// - `StompConnector`: STOMP 1.2 over TCP
/// - `MockConnector`: in-memory recorder for testing
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, group: &EndpointGroup) -> Result<Box<dyn Session>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        let endpoint = Endpoint::new("esb-a-test.sensors.elex.be", 61501);
        assert_eq!(endpoint.to_string(), "esb-a-test.sensors.elex.be:61501");
    }

    #[test]
    fn test_single_plan_has_one_group() {
        let plan = DeliveryPlan::single("localhost", 61613);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.groups[0].endpoints.len(), 1);
    }
}
