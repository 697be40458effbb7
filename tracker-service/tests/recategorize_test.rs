//! Recategorization tests over a real database.
//!
//! Requires Postgres. Run with: cargo test -p tracker-service -- --ignored

mod common;

use std::sync::Arc;

use calamine::Data;
use common::TestApp;
use uuid::Uuid;

use tracker_service::models::IssuerCode;
use tracker_service::services::gmail::MockMailProvider;
use tracker_service::services::ingest::{IngestError, UploadMeta};
use tracker_service::services::providers::mock::MockTextProvider;
use tracker_service::services::spreadsheet::RawRow;

fn single_row() -> RawRow {
    RawRow {
        date: Data::String("2026-07-01".to_string()),
        card_number: Data::Empty,
        merchant_name: Data::String("스타벅스".to_string()),
        approval_amount: Data::Empty,
        amount: Data::String("5,600원".to_string()),
        vat: Data::Empty,
        relation: Data::Empty,
        installment: Data::Empty,
        status: Data::Empty,
        merchant_number: Data::Empty,
        business_number: Data::Empty,
    }
}

async fn seeded_transaction(app: &TestApp) -> (uuid::Uuid, uuid::Uuid) {
    let user = app.seed_user().await;
    app.seed_card_company(IssuerCode::Hyundai).await;
    let default = app.seed_category("기타").await;
    app.seed_category("식비").await;

    // Ingest with a failing classifier so the row lands on the default.
    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::failing()),
        Arc::new(MockMailProvider::empty()),
    );
    ingest
        .ingest_rows(
            user.user_id,
            UploadMeta {
                original_name: "hyundai.xlsx".to_string(),
                file_size: 1024,
            },
            format!("hash-{}", Uuid::new_v4().simple()),
            vec![single_row()],
        )
        .await
        .expect("seeding ingestion failed");

    let stored = app
        .db
        .list_transactions(user.user_id, None, None, 10, 0)
        .await
        .expect("list failed");
    (stored[0].transaction_id, default.category_id)
}

#[tokio::test]
#[ignore]
async fn unmatched_suggestion_is_returned_but_changes_nothing() {
    let app = TestApp::spawn().await;
    let (transaction_id, original_category) = seeded_transaction(&app).await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("Unknown Category")),
        Arc::new(MockMailProvider::empty()),
    );

    let suggestion = ingest
        .recategorize(transaction_id)
        .await
        .expect("recategorize failed");
    assert_eq!(suggestion, "Unknown Category");

    let reloaded = app
        .db
        .find_transaction_by_id(transaction_id)
        .await
        .expect("lookup failed")
        .expect("transaction missing");
    assert_eq!(reloaded.category_id, original_category);
}

#[tokio::test]
#[ignore]
async fn matching_suggestion_updates_the_stored_category() {
    let app = TestApp::spawn().await;
    let (transaction_id, original_category) = seeded_transaction(&app).await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("식비")),
        Arc::new(MockMailProvider::empty()),
    );

    let suggestion = ingest
        .recategorize(transaction_id)
        .await
        .expect("recategorize failed");
    assert_eq!(suggestion, "식비");

    let reloaded = app
        .db
        .find_transaction_by_id(transaction_id)
        .await
        .expect("lookup failed")
        .expect("transaction missing");
    assert_ne!(reloaded.category_id, original_category);
}

#[tokio::test]
#[ignore]
async fn missing_transaction_is_not_found() {
    let app = TestApp::spawn().await;
    app.seed_category("기타").await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("기타")),
        Arc::new(MockMailProvider::empty()),
    );

    let result = ingest.recategorize(Uuid::new_v4()).await;
    assert!(matches!(result, Err(IngestError::TransactionNotFound(_))));
}
