//! The full choreography: an order posted to intake ends up in the
//! notifier's history.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use billing_service::InMemoryPaymentGateway;
use broker::InMemoryBroker;
use choreography::ConnectionState;
use fulfillment::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use notification_service::InMemoryNotificationSender;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn fast_config() -> Config {
    Config {
        retry_delay: Duration::from_millis(20),
        history_capacity: 10,
        ..Config::default()
    }
}

fn order(total: u32) -> Request<Body> {
    let body = serde_json::json!({
        "customerId": "c1",
        "items": [{
            "productId": "p1",
            "name": "Widget",
            "price": total,
            "quantity": 1
        }],
        "totalAmount": total
    });
    Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or_default())
}

/// Posts until intake accepts; the publisher is installed just after the
/// connection comes up.
async fn place_order(app: &Router, total: u32) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let (status, json) = send(app.clone(), order(total)).await;
            if status == StatusCode::ACCEPTED {
                return json;
            }
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("order intake never accepted the order")
}

async fn notifications(app: Router, count: usize) -> Vec<serde_json::Value> {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let (_, json) = send(
                app.clone(),
                Request::builder()
                    .uri("/api/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            let records = json.as_array().cloned().unwrap_or_default();
            if records.len() >= count {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("notifications not delivered in time")
}

#[tokio::test]
async fn test_order_flows_through_to_notification() {
    let broker = InMemoryBroker::with_partitions(3);
    let sender = InMemoryNotificationSender::new();
    let shutdown = CancellationToken::new();
    let services = fulfillment::start_with(
        &fast_config(),
        broker.clone(),
        PrometheusBuilder::new().build_recorder().handle(),
        shutdown.clone(),
        InMemoryPaymentGateway::new(),
        sender.clone(),
    );
    services.wait_until_connected().await;

    let created = place_order(&services.order_app, 50).await;
    let order_id = created["orderId"].as_str().unwrap().to_string();

    let records = notifications(services.notification_app.clone(), 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["orderId"], order_id.as_str());
    assert_eq!(records[0]["channel"], "EMAIL");
    assert_eq!(records[0]["deliveryStatus"], "SENT");

    assert_eq!(broker.message_count("order-created"), 1);
    assert_eq!(broker.message_count("payment-requests"), 1);
    assert_eq!(broker.message_count("notification-events"), 1);
    let delivered = sender.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].order_id.as_str(), order_id);

    shutdown.cancel();
    let monitors = services.monitors().to_vec();
    services.join().await;
    assert!(
        monitors
            .iter()
            .all(|m| m.state() == ConnectionState::Disconnected)
    );
}

#[tokio::test]
async fn test_declined_payment_notifies_by_sms() {
    let broker = InMemoryBroker::new();
    let gateway = InMemoryPaymentGateway::new();
    gateway.set_decline(Some("Payment processing failed"));
    let shutdown = CancellationToken::new();
    let services = fulfillment::start_with(
        &fast_config(),
        broker,
        PrometheusBuilder::new().build_recorder().handle(),
        shutdown.clone(),
        gateway,
        InMemoryNotificationSender::new(),
    );
    services.wait_until_connected().await;

    place_order(&services.order_app, 75).await;
    let records = notifications(services.notification_app.clone(), 1).await;
    assert_eq!(records[0]["channel"], "SMS");

    shutdown.cancel();
    services.join().await;
}

#[tokio::test]
async fn test_services_attach_once_the_broker_appears() {
    let broker = InMemoryBroker::new();
    broker.set_available(false);
    let shutdown = CancellationToken::new();
    let services = fulfillment::start_with(
        &fast_config(),
        broker.clone(),
        PrometheusBuilder::new().build_recorder().handle(),
        shutdown.clone(),
        InMemoryPaymentGateway::new(),
        InMemoryNotificationSender::new(),
    );

    for app in [&services.order_app, &services.billing_app, &services.notification_app] {
        let (status, json) = send(
            app.clone(),
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "DOWN");
    }

    broker.set_available(true);
    tokio::time::timeout(Duration::from_secs(2), services.wait_until_connected())
        .await
        .expect("services never attached");

    place_order(&services.order_app, 20).await;
    notifications(services.notification_app.clone(), 1).await;

    shutdown.cancel();
    services.join().await;
}

#[tokio::test]
async fn test_shutdown_before_connecting_stops_every_service() {
    let broker = InMemoryBroker::new();
    broker.set_available(false);
    let config = Config {
        retry_delay: Duration::from_secs(60),
        ..Config::default()
    };
    let shutdown = CancellationToken::new();
    let services = fulfillment::start(
        &config,
        broker,
        PrometheusBuilder::new().build_recorder().handle(),
        shutdown.clone(),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), services.join())
        .await
        .expect("services did not stop while retrying");
}
