//! Mock connector implementation for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{BusError, Connector, EndpointGroup, Result, Session};

/// One observed transport call, in call order.
///
/// `group` is the sequential index of the `open` call that produced the
/// session, which matches plan order for the sequential fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect {
        group: usize,
    },
    Send {
        group: usize,
        destination: String,
        body: Vec<u8>,
    },
    Close {
        group: usize,
    },
}

/// Mock connector for testing.
///
/// Records every connect/send/close and can be told to fail a given
/// group's connect or publish.
#[derive(Default)]
pub struct MockConnector {
    calls: Arc<Mutex<Vec<MockCall>>>,
    opened: Mutex<usize>,
    fail_connect_on: Mutex<Option<usize>>,
    fail_send_on: Mutex<Option<usize>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the connect for the given group index.
    pub async fn set_fail_connect_on(&self, group: usize) {
        *self.fail_connect_on.lock().await = Some(group);
    }

    /// Fail the publish for the given group index.
    pub async fn set_fail_send_on(&self, group: usize) {
        *self.fail_send_on.lock().await = Some(group);
    }

    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    /// Bodies of all recorded publishes.
    pub async fn sent_bodies(&self) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                MockCall::Send { body, .. } => Some(body.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, _group: &EndpointGroup) -> Result<Box<dyn Session>> {
        let group = {
            let mut opened = self.opened.lock().await;
            let index = *opened;
            *opened += 1;
            index
        };

        if *self.fail_connect_on.lock().await == Some(group) {
            return Err(BusError::Connect(format!(
                "Mock connect failure for group {}",
                group
            )));
        }

        self.calls.lock().await.push(MockCall::Connect { group });
        Ok(Box::new(MockSession {
            group,
            fail_send: *self.fail_send_on.lock().await == Some(group),
            calls: self.calls.clone(),
        }))
    }
}

/// Session handed out by [`MockConnector`].
pub struct MockSession {
    group: usize,
    fail_send: bool,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

#[async_trait]
impl Session for MockSession {
    async fn send(&mut self, destination: &str, body: &[u8]) -> Result<()> {
        if self.fail_send {
            return Err(BusError::Publish(format!(
                "Mock publish failure for group {}",
                self.group
            )));
        }
        self.calls.lock().await.push(MockCall::Send {
            group: self.group,
            destination: destination.to_string(),
            body: body.to_vec(),
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.calls
            .lock()
            .await
            .push(MockCall::Close { group: self.group });
        Ok(())
    }
}
