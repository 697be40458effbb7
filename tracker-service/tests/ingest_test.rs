//! File-ingestion pipeline tests over a real database.
//!
//! Requires Postgres. Run with: cargo test -p tracker-service -- --ignored

mod common;

use std::sync::Arc;

use calamine::Data;
use common::TestApp;
use uuid::Uuid;

use tracker_service::config::GenaiConfig;
use tracker_service::models::IssuerCode;
use tracker_service::services::classifier::Categorizer;
use tracker_service::services::gmail::MockMailProvider;
use tracker_service::services::ingest::{IngestError, IngestService, UploadMeta};
use tracker_service::services::providers::mock::MockTextProvider;
use tracker_service::services::spreadsheet::RawRow;

fn raw_row(date: &str, merchant: &str, amount: &str) -> RawRow {
    RawRow {
        date: Data::String(date.to_string()),
        card_number: Data::String("1234-56**-****-7890".to_string()),
        merchant_name: Data::String(merchant.to_string()),
        approval_amount: Data::Empty,
        amount: Data::String(amount.to_string()),
        vat: Data::Empty,
        relation: Data::Empty,
        installment: Data::String("일시불".to_string()),
        status: Data::String("승인".to_string()),
        merchant_number: Data::Empty,
        business_number: Data::Empty,
    }
}

fn upload_meta(name: &str) -> UploadMeta {
    UploadMeta {
        original_name: name.to_string(),
        file_size: 4096,
    }
}

fn unique_hash() -> String {
    format!("test-hash-{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore]
async fn upload_with_invalid_row_persists_only_valid_rows() {
    let app = TestApp::spawn().await;
    let user = app.seed_user().await;
    let company = app.seed_card_company(IssuerCode::Hyundai).await;
    app.seed_category("기타").await;
    let food = app.seed_category("식비").await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("식비\n식비\n기타")),
        Arc::new(MockMailProvider::empty()),
    );

    let rows = vec![
        raw_row("2026-07-01", "스타벅스", "5,600원"),
        raw_row("2026-07-02", "GS25", "2,100원"),
        raw_row("definitely-not-a-date", "CU", "1,000원"),
        raw_row("2026-07-03", "택시", "12,000원"),
    ];

    let summary = ingest
        .ingest_rows(
            user.user_id,
            upload_meta("현대카드_이용내역.xlsx"),
            unique_hash(),
            rows,
        )
        .await
        .expect("ingestion failed");

    assert_eq!(summary.issuer, IssuerCode::Hyundai);
    assert_eq!(summary.persisted, 3);
    assert_eq!(summary.skipped, 1);

    let stored = app
        .db
        .list_transactions(user.user_id, None, None, 100, 0)
        .await
        .expect("list failed");
    assert_eq!(stored.len(), 3);
    assert!(stored
        .iter()
        .all(|t| t.card_company_id == company.card_company_id));
    assert!(stored.iter().all(|t| t.file_id.is_some()));

    // First two merchants were classified as 식비 by the mock.
    let food_count = stored
        .iter()
        .filter(|t| t.category_id == food.category_id)
        .count();
    assert_eq!(food_count, 2);
}

#[tokio::test]
#[ignore]
async fn latin_filename_detects_the_same_issuer() {
    let app = TestApp::spawn().await;
    let user = app.seed_user().await;
    app.seed_card_company(IssuerCode::Hyundai).await;
    app.seed_category("기타").await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("기타")),
        Arc::new(MockMailProvider::empty()),
    );

    let summary = ingest
        .ingest_rows(
            user.user_id,
            upload_meta("hyundai-2026-07.xlsx"),
            unique_hash(),
            vec![raw_row("2026-07-01", "서점", "15,000원")],
        )
        .await
        .expect("ingestion failed");

    assert_eq!(summary.issuer, IssuerCode::Hyundai);
    assert_eq!(summary.persisted, 1);
}

#[tokio::test]
#[ignore]
async fn classifier_failure_degrades_every_row_to_the_default_category() {
    let app = TestApp::spawn().await;
    let user = app.seed_user().await;
    app.seed_card_company(IssuerCode::Shinhan).await;
    let default = app.seed_category("기타").await;
    app.seed_category("식비").await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::failing()),
        Arc::new(MockMailProvider::empty()),
    );

    let summary = ingest
        .ingest_rows(
            user.user_id,
            upload_meta("shinhan.xlsx"),
            unique_hash(),
            vec![
                raw_row("2026-07-01", "스타벅스", "5,600원"),
                raw_row("2026-07-02", "김밥천국", "7,000원"),
            ],
        )
        .await
        .expect("classifier failure must not abort ingestion");

    assert_eq!(summary.persisted, 2);

    let stored = app
        .db
        .list_transactions(user.user_id, None, None, 100, 0)
        .await
        .expect("list failed");
    assert!(stored.iter().all(|t| t.category_id == default.category_id));
}

#[tokio::test]
#[ignore]
async fn batch_line_count_mismatch_degrades_to_the_default_category() {
    let app = TestApp::spawn().await;
    let user = app.seed_user().await;
    app.seed_card_company(IssuerCode::Kb).await;
    let default = app.seed_category("기타").await;
    let food = app.seed_category("식비").await;

    // One line back for two merchants: the partial result is discarded.
    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("식비")),
        Arc::new(MockMailProvider::empty()),
    );

    ingest
        .ingest_rows(
            user.user_id,
            upload_meta("kb_card.xlsx"),
            unique_hash(),
            vec![
                raw_row("2026-07-01", "식당", "9,000원"),
                raw_row("2026-07-02", "마트", "31,200원"),
            ],
        )
        .await
        .expect("ingestion failed");

    let stored = app
        .db
        .list_transactions(user.user_id, None, None, 100, 0)
        .await
        .expect("list failed");
    assert!(stored.iter().all(|t| t.category_id == default.category_id));
    assert!(stored.iter().all(|t| t.category_id != food.category_id));
}

#[tokio::test]
#[ignore]
async fn disabled_classifier_uses_the_default_category() {
    let app = TestApp::spawn().await;
    let user = app.seed_user().await;
    app.seed_card_company(IssuerCode::Lotte).await;
    let default = app.seed_category("기타").await;
    app.seed_category("식비").await;

    let ingest = IngestService::new(
        app.db.clone(),
        Categorizer::new(Arc::new(MockTextProvider::replying("식비"))),
        Arc::new(MockMailProvider::empty()),
        GenaiConfig {
            text_model: "gemini-2.0-flash".to_string(),
            enabled: false,
        },
        app.config.gmail.clone(),
    );

    ingest
        .ingest_rows(
            user.user_id,
            upload_meta("lotte.xlsx"),
            unique_hash(),
            vec![raw_row("2026-07-01", "식당", "9,000원")],
        )
        .await
        .expect("ingestion failed");

    let stored = app
        .db
        .list_transactions(user.user_id, None, None, 100, 0)
        .await
        .expect("list failed");
    assert_eq!(stored[0].category_id, default.category_id);
}

#[tokio::test]
#[ignore]
async fn unknown_issuer_aborts_ingestion() {
    let app = TestApp::spawn().await;
    let user = app.seed_user().await;
    app.seed_category("기타").await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("기타")),
        Arc::new(MockMailProvider::empty()),
    );

    let result = ingest
        .ingest_rows(
            user.user_id,
            upload_meta("bank_statement.xlsx"),
            unique_hash(),
            vec![raw_row("2026-07-01", "서점", "15,000원")],
        )
        .await;

    assert!(matches!(
        result,
        Err(IngestError::UnknownIssuer(IssuerCode::Unknown))
    ));

    let stored = app
        .db
        .list_transactions(user.user_id, None, None, 100, 0)
        .await
        .expect("list failed");
    assert!(stored.is_empty());
}

#[tokio::test]
#[ignore]
async fn missing_categories_abort_ingestion() {
    let app = TestApp::spawn().await;
    let user = app.seed_user().await;
    app.seed_card_company(IssuerCode::Hana).await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("기타")),
        Arc::new(MockMailProvider::empty()),
    );

    let result = ingest
        .ingest_rows(
            user.user_id,
            upload_meta("hana.xlsx"),
            unique_hash(),
            vec![raw_row("2026-07-01", "서점", "15,000원")],
        )
        .await;

    assert!(matches!(result, Err(IngestError::NoCategories)));
}

#[tokio::test]
#[ignore]
async fn unknown_acting_user_aborts_ingestion() {
    let app = TestApp::spawn().await;
    app.seed_card_company(IssuerCode::Hyundai).await;
    app.seed_category("기타").await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("기타")),
        Arc::new(MockMailProvider::empty()),
    );

    let result = ingest
        .ingest_rows(
            Uuid::new_v4(),
            upload_meta("hyundai.xlsx"),
            unique_hash(),
            vec![raw_row("2026-07-01", "서점", "15,000원")],
        )
        .await;

    assert!(matches!(result, Err(IngestError::UnknownUser(_))));
}

#[tokio::test]
#[ignore]
async fn identical_upload_is_rejected_as_duplicate() {
    let app = TestApp::spawn().await;
    let user = app.seed_user().await;
    app.seed_card_company(IssuerCode::Hyundai).await;
    app.seed_category("기타").await;

    let ingest = app.ingest_service(
        Arc::new(MockTextProvider::replying("기타")),
        Arc::new(MockMailProvider::empty()),
    );

    let hash = unique_hash();
    ingest
        .ingest_rows(
            user.user_id,
            upload_meta("hyundai.xlsx"),
            hash.clone(),
            vec![raw_row("2026-07-01", "서점", "15,000원")],
        )
        .await
        .expect("first upload");

    let second = ingest
        .ingest_rows(
            user.user_id,
            upload_meta("hyundai.xlsx"),
            hash,
            vec![raw_row("2026-07-01", "서점", "15,000원")],
        )
        .await;

    assert!(matches!(second, Err(IngestError::DuplicateUpload)));

    let stored = app
        .db
        .list_transactions(user.user_id, None, None, 100, 0)
        .await
        .expect("list failed");
    assert_eq!(stored.len(), 1);
}
