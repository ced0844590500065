use user_store::schema::MAX_TEXT_LENGTH;
use user_store::{MemoryUserStore, NewUser, RecordStore, SchemaVariant, StoreError, Violation};

fn john() -> NewUser {
    NewUser::new("John Doe", 43, "fake@email.com")
}

// Drives any store through the insert-then-read flow of the demo binary
async fn insert_then_read(store: &dyn RecordStore) -> Result<Option<user_store::User>, StoreError> {
    store.insert(john()).await?;
    store.find_first().await
}

#[tokio::test]
async fn test_round_trip_through_trait_object() {
    let store = MemoryUserStore::default();
    let first = insert_then_read(&store).await.unwrap().unwrap();

    assert!(!first.id.is_nil());
    assert_eq!(
        (first.name.as_str(), first.age, first.email.as_str()),
        ("John Doe", Some(43), "fake@email.com")
    );
}

#[tokio::test]
async fn test_empty_store_reads_none() {
    let store = MemoryUserStore::new(SchemaVariant::Strict);
    assert_eq!(store.find_first().await.unwrap(), None);
}

#[tokio::test]
async fn test_duplicate_email_leaves_one_record() {
    let store = MemoryUserStore::default();
    store.insert(john()).await.unwrap();

    let err = store
        .insert(NewUser::new("Jane Doe", 29, "fake@email.com"))
        .await
        .unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&Violation::Duplicate {
            column: "email".to_string()
        })
    );

    let records = store.records().await;
    assert_eq!(
        records
            .iter()
            .filter(|user| user.email == "fake@email.com")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_missing_fields_do_not_create_records() {
    let store = MemoryUserStore::new(SchemaVariant::Strict);
    for new_user in [
        NewUser::default().with_age(43).with_email("a@example.com"),
        NewUser::default().with_name("John Doe").with_age(43),
        NewUser::default().with_name("John Doe").with_email("b@example.com"),
    ] {
        assert!(store.insert(new_user).await.unwrap_err().is_constraint_violation());
    }
    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn test_relaxed_store_accepts_missing_age() {
    let store = MemoryUserStore::new(SchemaVariant::Relaxed);
    let user = store
        .insert(NewUser::default().with_name("John Doe").with_email("fake@email.com"))
        .await
        .unwrap();
    assert_eq!(user.age, None);
}

#[tokio::test]
async fn test_length_boundary() {
    let store = MemoryUserStore::default();
    store
        .insert(NewUser::new("n".repeat(MAX_TEXT_LENGTH), 43, "fake@email.com"))
        .await
        .unwrap();

    let err = store
        .insert(NewUser::new("n".repeat(MAX_TEXT_LENGTH + 1), 43, "other@email.com"))
        .await
        .unwrap_err();
    assert!(matches!(err.violation(), Some(Violation::TooLong { .. })));
    assert_eq!(store.records().await.len(), 1);
}

#[tokio::test]
async fn test_find_first_is_insertion_ordered() {
    let store = MemoryUserStore::default();
    let first = store.insert(john()).await.unwrap();
    let second = store
        .insert(NewUser::new("Jane Doe", 29, "jane@email.com"))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(store.find_first().await.unwrap(), Some(first));
}
