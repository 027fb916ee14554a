//! Delivery fan-out.
//!
//! Takes one event and a delivery plan and performs a
//! connect -> publish -> close cycle against every endpoint group, in plan
//! order. Groups are independent: one group's failure never blocks the
//! rest, and per-group outcomes are aggregated into a [`DeliveryReport`].

use tracing::{info, warn};

use crate::bus::{BusError, Connector, DeliveryPlan, Endpoint, EndpointGroup};
use crate::event::Event;
use crate::wire;

/// Topic the multi-group schema publishes to.
pub const EVENT_TOPIC: &str = "/topic/VirtualTopic.event";

/// Topic used by the legacy single-endpoint schema.
pub const LEGACY_EVENT_TOPIC: &str = "/topic/event";

/// Outcome of one endpoint group's publish cycle.
#[derive(Debug)]
pub struct GroupOutcome {
    /// Position of the group in the plan.
    pub group: usize,
    pub result: Result<(), BusError>,
}

/// Aggregated per-group outcomes for one delivery.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<GroupOutcome>,
}

impl DeliveryReport {
    /// True when every group was published to.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    /// Groups that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &BusError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|e| (outcome.group, e)))
    }
}

/// Publish `event` to every endpoint group in `plan`.
///
/// Each group gets exactly one connect -> publish -> close cycle; the
/// session is released on every path, publish failure included. Delivery
/// is sequential and continues past failed groups.
pub async fn deliver(
    event: &Event,
    plan: &DeliveryPlan,
    connector: &dyn Connector,
) -> DeliveryReport {
    let body = wire::to_xml(event);
    let mut report = DeliveryReport::default();
    for (index, group) in plan.groups.iter().enumerate() {
        let result = publish_to_group(group, EVENT_TOPIC, body.as_bytes(), connector).await;
        match &result {
            Ok(()) => info!(
                group = index,
                topic = EVENT_TOPIC,
                kind = event.kind.wire_name(),
                path = %event.path,
                "Event published"
            ),
            Err(error) => warn!(group = index, %error, "Event delivery failed"),
        }
        report.outcomes.push(GroupOutcome {
            group: index,
            result,
        });
    }
    report
}

/// Legacy convenience form: one implicit group, legacy topic.
pub async fn deliver_single(
    event: &Event,
    endpoint: Endpoint,
    connector: &dyn Connector,
) -> DeliveryReport {
    let body = wire::to_xml(event);
    let group = EndpointGroup::new(vec![endpoint]);
    let result = publish_to_group(&group, LEGACY_EVENT_TOPIC, body.as_bytes(), connector).await;
    match &result {
        Ok(()) => info!(topic = LEGACY_EVENT_TOPIC, kind = event.kind.wire_name(), "Event published"),
        Err(error) => warn!(%error, "Event delivery failed"),
    }
    DeliveryReport {
        outcomes: vec![GroupOutcome { group: 0, result }],
    }
}

async fn publish_to_group(
    group: &EndpointGroup,
    destination: &str,
    body: &[u8],
    connector: &dyn Connector,
) -> Result<(), BusError> {
    let mut session = connector.open(group).await?;
    let sent = session.send(destination, body).await;
    // Release unconditionally, publish failure included.
    let _ = session.close().await;
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MockCall, MockConnector};
    use crate::event::{EventKind, Wmdb};
    use chrono::NaiveDate;

    fn make_event() -> Event {
        let at = NaiveDate::from_ymd_opt(2012, 12, 7)
            .unwrap()
            .and_hms_opt(8, 56, 0)
            .unwrap();
        Event::new(
            EventKind::UpdatedWafermap,
            "sda.sensors.elex.be",
            at,
            Wmdb::new("sda.sensors.elex.be", 6913),
            Some("catmap".to_string()),
            "/mnt/categorymaps/WC_A12345_1.th01",
        )
    }

    fn make_plan(groups: usize) -> DeliveryPlan {
        DeliveryPlan::new(
            (0..groups)
                .map(|i| EndpointGroup::single(format!("broker-{}.elex.be", i), 61613))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_one_cycle_per_group_in_plan_order() {
        let connector = MockConnector::new();
        let event = make_event();

        let report = deliver(&event, &make_plan(3), &connector).await;

        assert!(report.is_complete());
        let expected_body = wire::to_xml(&event).into_bytes();
        let mut expected = Vec::new();
        for group in 0..3 {
            expected.push(MockCall::Connect { group });
            expected.push(MockCall::Send {
                group,
                destination: EVENT_TOPIC.to_string(),
                body: expected_body.clone(),
            });
            expected.push(MockCall::Close { group });
        }
        assert_eq!(connector.calls().await, expected);
    }

    #[tokio::test]
    async fn test_failed_publish_still_closes_session() {
        let connector = MockConnector::new();
        connector.set_fail_send_on(1).await;

        let report = deliver(&make_event(), &make_plan(3), &connector).await;

        assert!(!report.is_complete());
        let failures: Vec<usize> = report.failures().map(|(group, _)| group).collect();
        assert_eq!(failures, vec![1]);

        // Group 1 produced no Send, but its session was still closed.
        let calls = connector.calls().await;
        assert!(calls.contains(&MockCall::Connect { group: 1 }));
        assert!(calls.contains(&MockCall::Close { group: 1 }));
        assert!(!calls
            .iter()
            .any(|call| matches!(call, MockCall::Send { group: 1, .. })));
    }

    #[tokio::test]
    async fn test_failed_connect_does_not_abort_remaining_groups() {
        let connector = MockConnector::new();
        connector.set_fail_connect_on(0).await;

        let report = deliver(&make_event(), &make_plan(2), &connector).await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0].result.is_err());
        assert!(report.outcomes[1].result.is_ok());

        let calls = connector.calls().await;
        assert!(calls.contains(&MockCall::Connect { group: 1 }));
    }

    #[tokio::test]
    async fn test_legacy_single_endpoint_uses_legacy_topic() {
        let connector = MockConnector::new();
        let mut event = make_event();
        event.wafermap_type = None;

        let report =
            deliver_single(&event, Endpoint::new("localhost", 61613), &connector).await;

        assert!(report.is_complete());
        let calls = connector.calls().await;
        assert_eq!(calls.len(), 3);
        match &calls[1] {
            MockCall::Send { destination, body, .. } => {
                assert_eq!(destination, LEGACY_EVENT_TOPIC);
                assert!(!String::from_utf8_lossy(body).contains("wafermaptype"));
            }
            other => panic!("expected a Send, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_plan_delivers_nowhere() {
        let connector = MockConnector::new();
        let report = deliver(&make_event(), &DeliveryPlan::default(), &connector).await;

        assert!(report.is_complete());
        assert!(report.outcomes.is_empty());
        assert!(connector.calls().await.is_empty());
    }
}
