//! Stored document layout.
//!
//! Other clients read the same documents, so field names, status strings,
//! and the share link format are part of the contract.

use split_kit::backend::{DocumentStore, InMemoryStore};
use split_kit::key::DocumentPath;
use split_kit::model::{Item, Participant};
use split_kit::serialization::{CURRENT_SCHEMA_VERSION, SCHEMA_VERSION_FIELD};
use split_kit::{CoordinatorConfig, Error, NewEvent, NewParticipant, SplitService};

fn lunch() -> NewEvent {
    NewEvent::new("user_1", "Ayu", "Lunch")
        .with_items(vec![Item::new("a", "Nasi", 1, 3000)])
        .with_tax(300)
        .with_participant(NewParticipant::creator("Ayu").with_user("user_1").with_items(["a"]))
        .with_participant(NewParticipant::new("Budi").with_items(["a"]))
}

#[tokio::test]
async fn test_event_document_fields() {
    let store = InMemoryStore::new();
    let splits = SplitService::new(store.clone());
    let event_id = splits.create_event(lunch()).await.unwrap();

    let doc = store
        .get(&DocumentPath::event(&event_id))
        .await
        .unwrap()
        .expect("Event document missing");

    assert_eq!(doc["creator_id"], "user_1");
    assert_eq!(doc["creator_name"], "Ayu");
    assert_eq!(doc["event_name"], "Lunch");
    assert_eq!(doc["subtotal"], 3000);
    assert_eq!(doc["tax_amount"], 300);
    assert_eq!(doc["service_fee"], 0);
    assert_eq!(doc["total_amount"], 3300);
    assert_eq!(doc["status"], "ongoing");
    assert!(doc["timestamp"].is_string());
    assert_eq!(doc[SCHEMA_VERSION_FIELD], CURRENT_SCHEMA_VERSION);
    assert_eq!(
        doc["share_link"],
        format!("https://billbuddy.app/event?eventId={}", event_id)
    );
}

#[tokio::test]
async fn test_child_document_fields() {
    let store = InMemoryStore::new();
    let splits = SplitService::new(store.clone());
    let event_id = splits.create_event(lunch()).await.unwrap();

    let item = store
        .get(&DocumentPath::record::<Item>(&event_id, "a"))
        .await
        .unwrap()
        .expect("Item document missing");
    assert_eq!(item["name"], "Nasi");
    assert_eq!(item["quantity"], 1);
    assert_eq!(item["unitPrice"], 3000);
    assert_eq!(item["totalPrice"], 3000);

    let participants = store
        .list(&DocumentPath::collection::<Participant>(&event_id))
        .await
        .unwrap();
    assert_eq!(participants.len(), 2);

    let (_, creator) = participants
        .iter()
        .find(|(_, doc)| doc["isCreator"] == true)
        .expect("Creator document missing");
    assert_eq!(creator["userId"], "user_1");
    assert_eq!(creator["paid"], true);
    assert_eq!(creator["amount"], 1650);
    assert_eq!(creator["itemsAssigned"], serde_json::json!(["a"]));
}

#[tokio::test]
async fn test_completed_status_string() {
    let store = InMemoryStore::new();
    let splits = SplitService::new(store.clone());
    let event_id = splits.create_event(lunch()).await.unwrap();
    let snapshot = splits.get_event(&event_id).await.unwrap();
    let budi = snapshot.non_creators().next().unwrap().id.clone();

    splits.update_payment_status(&event_id, &budi, true).await.unwrap();

    let doc = store.get(&DocumentPath::event(&event_id)).await.unwrap().unwrap();
    assert_eq!(doc["status"], "completed");
}

#[tokio::test]
async fn test_custom_share_link_base() {
    let config = CoordinatorConfig::default().with_share_link_base("https://split.example/e");
    let splits = SplitService::with_config(InMemoryStore::new(), config).unwrap();
    let event_id = splits.create_event(lunch()).await.unwrap();

    assert_eq!(
        splits.share_link(&event_id).await.unwrap(),
        format!("https://split.example/e?eventId={}", event_id)
    );
}

#[tokio::test]
async fn test_newer_schema_is_rejected() {
    let store = InMemoryStore::new();
    let splits = SplitService::new(store.clone());
    let event_id = splits.create_event(lunch()).await.unwrap();

    let mut fields = serde_json::Map::new();
    fields.insert(
        SCHEMA_VERSION_FIELD.to_string(),
        serde_json::json!(CURRENT_SCHEMA_VERSION + 1),
    );
    store
        .update(&DocumentPath::event(&event_id), fields)
        .await
        .unwrap();

    assert!(matches!(
        splits.get_event(&event_id).await,
        Err(Error::VersionMismatch { .. })
    ));
}
