//! Notification lifecycle
//!
//! Receiving, processing and rolling back notifications between peers, and
//! keeping the open-notification sweep scoped to the receiving device.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_matches::assert_matches;
use tessera_consumption::{
    ConsumptionConfig, ConsumptionError, ConsumptionEvent, LocalNotificationStatus,
    NotificationItem,
};
use tessera_testkit::{init_test_tracing, test_item, TestNetwork};

#[tokio::test]
async fn test_single_item_notification_completes() {
    init_test_tracing();
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;

    let sent = alice
        .consumption
        .send_notification(&bob.address, vec![test_item("a", false)])
        .await
        .unwrap();
    assert!(sent.is_own);
    assert_eq!(sent.status, LocalNotificationStatus::Sent);

    let mut events = bob.consumption.subscribe();
    let received = bob.sync().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, sent.id);
    assert_eq!(received[0].status, LocalNotificationStatus::Open);
    assert_eq!(received[0].peer, alice.address);
    assert_eq!(received[0].received_by_device, Some(bob.device_id));

    let processed = bob
        .consumption
        .process_notification_by_id(sent.id)
        .await
        .unwrap();
    assert_eq!(processed.status, LocalNotificationStatus::Completed);
    assert_eq!(bob.ledger.processed_items(), vec!["a"]);
    assert_eq!(
        events.recv().await.unwrap(),
        ConsumptionEvent::NotificationProcessed {
            notification_id: sent.id,
            peer: alice.address.clone(),
        }
    );
}

#[tokio::test]
async fn test_failing_item_rolls_back_in_reverse_order() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;

    let sent = alice
        .consumption
        .send_notification(
            &bob.address,
            vec![test_item("a", false), test_item("b", false), test_item("c", true)],
        )
        .await
        .unwrap();
    bob.sync().await.unwrap();

    let err = bob
        .consumption
        .process_notification_by_id(sent.id)
        .await
        .unwrap_err();
    assert_matches!(err, ConsumptionError::NotificationItemRejected { .. });
    assert_eq!(bob.ledger.processed_items(), vec!["a", "b"]);
    assert_eq!(bob.ledger.rolled_back_items(), vec!["b", "a"]);

    let stored = bob
        .consumption
        .notifications()
        .get_notification(sent.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, LocalNotificationStatus::Open);
}

#[tokio::test]
async fn test_completed_notification_is_not_processed_again() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;

    let sent = alice
        .consumption
        .send_notification(&bob.address, vec![test_item("a", false)])
        .await
        .unwrap();
    bob.sync_and_process().await.unwrap();
    let again = bob
        .consumption
        .process_notification_by_id(sent.id)
        .await
        .unwrap();

    assert!(again.is_completed());
    assert_eq!(bob.ledger.processed_items(), vec!["a"]);
    assert!(bob.sync_and_process().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_receiving_twice_keeps_one_record() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;
    alice
        .consumption
        .send_notification(&bob.address, vec![test_item("a", false)])
        .await
        .unwrap();

    let bob_laptop = network.add_device(&bob);
    let first = bob.sync().await.unwrap();
    let second = bob_laptop.sync().await.unwrap();

    assert_eq!(first[0], second[0]);
    assert_eq!(second[0].received_by_device, Some(bob.device_id));
}

#[tokio::test]
async fn test_sweep_only_processes_notifications_of_this_device() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let phone = network.add_peer("bob");
    let laptop = network.add_device(&phone);
    network.connect(&alice, &phone).await;

    let first = alice
        .consumption
        .send_notification(&phone.address, vec![test_item("n1", false)])
        .await
        .unwrap();
    phone.sync().await.unwrap();
    let second = alice
        .consumption
        .send_notification(&phone.address, vec![test_item("n2", false)])
        .await
        .unwrap();
    laptop.sync().await.unwrap();

    let completed = phone
        .consumption
        .process_open_notifications_received_by_current_device()
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, first.id);
    assert_eq!(phone.ledger.processed_items(), vec!["n1"]);

    let open = phone
        .consumption
        .notifications()
        .get_notifications(Some(&alice.address), Some(LocalNotificationStatus::Open))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, second.id);

    let completed = laptop
        .consumption
        .process_open_notifications_received_by_current_device()
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, second.id);
    assert_eq!(laptop.ledger.processed_items(), vec!["n2"]);
}

#[tokio::test]
async fn test_sweep_continues_after_a_failing_notification() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;

    let failing = alice
        .consumption
        .send_notification(&bob.address, vec![test_item("bad", true)])
        .await
        .unwrap();
    let fine = alice
        .consumption
        .send_notification(&bob.address, vec![test_item("good", false)])
        .await
        .unwrap();

    let completed = bob.sync_and_process().await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, fine.id);
    let stored = bob
        .consumption
        .notifications()
        .get_notification(failing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, LocalNotificationStatus::Open);
}

#[tokio::test]
async fn test_sweep_stops_on_error_when_configured() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer_with_config(
        "bob",
        ConsumptionConfig {
            sweep_continues_on_error: false,
            ..ConsumptionConfig::default()
        },
    );
    network.connect(&alice, &bob).await;
    alice
        .consumption
        .send_notification(&bob.address, vec![test_item("bad", true)])
        .await
        .unwrap();

    let err = bob.sync_and_process().await.unwrap_err();
    assert_matches!(err, ConsumptionError::NotificationItemRejected { .. });
}

#[tokio::test]
async fn test_too_many_items_are_refused() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer_with_config(
        "bob",
        ConsumptionConfig {
            max_items_per_notification: 2,
            ..ConsumptionConfig::default()
        },
    );
    network.connect(&alice, &bob).await;
    alice
        .consumption
        .send_notification(
            &bob.address,
            vec![test_item("a", false), test_item("b", false), test_item("c", false)],
        )
        .await
        .unwrap();

    let err = bob.sync().await.unwrap_err();
    assert_eq!(err, ConsumptionError::TooManyItems { count: 3, max: 2 });
    assert!(bob
        .consumption
        .notifications()
        .get_notifications(None, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unsupported_item_leaves_notification_open() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;
    let unknown = NotificationItem::extension("unknown", &serde_json::json!({})).unwrap();
    let sent = alice
        .consumption
        .send_notification(&bob.address, vec![test_item("a", false), unknown])
        .await
        .unwrap();
    bob.sync().await.unwrap();

    let err = bob
        .consumption
        .process_notification_by_id(sent.id)
        .await
        .unwrap_err();
    assert_matches!(err, ConsumptionError::UnsupportedNotificationItem { ref type_id } if type_id == "unknown");
    assert_eq!(bob.ledger.rolled_back_items(), vec!["a"]);
}

#[tokio::test]
async fn test_own_notification_cannot_be_processed() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;
    let sent = alice
        .consumption
        .send_notification(&bob.address, vec![test_item("a", false)])
        .await
        .unwrap();

    let err = alice
        .consumption
        .process_notification_by_id(sent.id)
        .await
        .unwrap_err();
    assert_eq!(err, ConsumptionError::CannotProcessOwnNotification(sent.id));
    assert!(alice.ledger.processed_items().is_empty());
}

#[tokio::test]
async fn test_other_device_records_own_notification_as_sent() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;
    let carol = network.add_peer("carol");
    let sent = carol
        .consumption
        .send_notification(&alice.address, vec![test_item("a", false)])
        .await
        .unwrap();
    let bob_laptop = network.add_device(&bob);
    let from_bob = bob
        .consumption
        .send_notification(&alice.address, vec![test_item("b", false)])
        .await
        .unwrap();

    let synced = bob_laptop.sync().await.unwrap();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].id, from_bob.id);
    assert!(synced[0].is_own);
    assert_eq!(synced[0].status, LocalNotificationStatus::Sent);

    let received = alice.sync().await.unwrap();
    let ids: Vec<_> = received.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![sent.id, from_bob.id]);
}

#[tokio::test]
async fn test_failed_send_removes_local_record() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;
    alice.effects.transport.set_offline(true);

    let notifications = alice.consumption.notifications();
    let id = notifications.next_notification_id().await;
    let err = notifications
        .send_notification_with_id(id, &bob.address, vec![test_item("a", false)])
        .await
        .unwrap_err();

    assert_matches!(err, ConsumptionError::Core(_));
    assert!(notifications.get_notification(id).await.unwrap().is_none());
    assert_eq!(network.relay().relayed().await, 0);
}

#[tokio::test]
async fn test_reused_notification_id_from_another_peer_is_rejected() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    let carol = network.add_peer("carol");
    network.connect(&alice, &bob).await;
    network.connect(&carol, &bob).await;

    let sent = alice
        .consumption
        .send_notification(&bob.address, vec![test_item("a", false)])
        .await
        .unwrap();
    bob.sync().await.unwrap();
    carol
        .consumption
        .notifications()
        .send_notification_with_id(sent.id, &bob.address, vec![test_item("c", false)])
        .await
        .unwrap();

    let err = bob.sync().await.unwrap_err();
    assert_eq!(
        err,
        ConsumptionError::NotificationIdConflict {
            notification: sent.id,
            peer: carol.address.clone(),
        }
    );
    let stored = bob
        .consumption
        .notifications()
        .get_notification(sent.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.peer, alice.address);
}

#[tokio::test]
async fn test_own_notification_id_echoed_by_peer_is_rejected() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");
    let bob = network.add_peer("bob");
    network.connect(&alice, &bob).await;

    let own = bob
        .consumption
        .send_notification(&alice.address, vec![test_item("b", false)])
        .await
        .unwrap();
    alice
        .consumption
        .notifications()
        .send_notification_with_id(own.id, &bob.address, vec![test_item("a", false)])
        .await
        .unwrap();

    let err = bob.sync().await.unwrap_err();
    assert!(err.is_spoofing());
    assert_matches!(err, ConsumptionError::NotificationIdConflict { notification, .. } if notification == own.id);
    let stored = bob
        .consumption
        .notifications()
        .get_notification(own.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_own);
    assert_eq!(stored.status, LocalNotificationStatus::Sent);
}

#[tokio::test]
async fn test_debug_output_names_the_account() {
    let network = TestNetwork::new();
    let alice = network.add_peer("alice");

    let rendered = format!("{:?}", alice.consumption);
    assert!(rendered.starts_with("Consumption"));
    assert!(rendered.contains("alice"));
    assert_eq!(alice.consumption.attributes().account().address, alice.address);
}
