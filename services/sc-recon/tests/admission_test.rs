//! 装箱扫描接收测试

mod common;

use chrono::{Duration, Utc};
use common::Fixture;
use sc_recon::ScanError;
use sc_recon::application::{AdmitScanCommand, FinalizeCartonCommand};
use sc_recon::domain::entities::CatalogRecord;
use sc_recon::domain::enums::ScanStatus;
use sc_recon::domain::value_objects::{QrToken, ScanContext};

#[tokio::test]
async fn test_admits_until_quota_then_rejects() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 2)]).await;
    let tokens = fx.labels("A", "SKU-A", 3).await;

    fx.admit("CT-1", &tokens[0]).await.unwrap();
    fx.admit("CT-1", &tokens[1]).await.unwrap();
    let err = fx.admit("CT-1", &tokens[2]).await.unwrap_err();

    assert!(matches!(
        err,
        ScanError::QuotaExceeded {
            expected: 2,
            scanned: 2,
            ..
        }
    ));
    assert_eq!(fx.scanned("CT-1", "SKU-A").await, 2);
    assert_eq!(fx.service.list_scans(&"CT-1".into()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_pending_carton_accepts_scans() {
    let fx = Fixture::new().await;
    fx.carton("CT-1", &[("SKU-A", 1)]).await;
    let token = fx.label("A1", "SKU-A").await;

    let scan = fx.admit("CT-1", &token).await.unwrap();

    assert_eq!(scan.status, ScanStatus::Validated);
    assert_eq!(scan.operator, "system");
    assert_eq!(scan.device, "api");
}

#[tokio::test]
async fn test_scan_context_is_recorded() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 1)]).await;
    let token = fx.label("A1", "SKU-A").await;

    let scan = fx
        .service
        .admit(
            AdmitScanCommand::new("CT-1", token.as_str())
                .with_context(ScanContext::new("maria", "gun-07")),
        )
        .await
        .unwrap();

    assert_eq!(scan.operator, "maria");
    assert_eq!(scan.device, "gun-07");
}

#[tokio::test]
async fn test_duplicate_scan_leaves_ledger_unchanged() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 3)]).await;
    let token = fx.label("A1", "SKU-A").await;

    fx.admit("CT-1", &token).await.unwrap();
    let err = fx.admit("CT-1", &token).await.unwrap_err();

    assert!(matches!(err, ScanError::DuplicateScan { .. }));
    assert_eq!(err.code(), "DUPLICATE_SCAN");
    assert_eq!(fx.scanned("CT-1", "SKU-A").await, 1);
}

#[tokio::test]
async fn test_quota_is_checked_before_duplicates() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 1)]).await;
    let token = fx.label("A1", "SKU-A").await;

    fx.admit("CT-1", &token).await.unwrap();
    let err = fx.admit("CT-1", &token).await.unwrap_err();

    assert!(matches!(err, ScanError::QuotaExceeded { .. }));
    assert_eq!(fx.scanned("CT-1", "SKU-A").await, 1);
}

#[tokio::test]
async fn test_sku_outside_plan_is_rejected() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 2)]).await;
    let token = fx.label("B1", "SKU-B").await;

    let err = fx.admit("CT-1", &token).await.unwrap_err();

    assert!(matches!(err, ScanError::SkuNotExpected { ref sku, .. } if sku == "SKU-B"));
    assert!(fx.service.list_scans(&"CT-1".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_misses() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 2)]).await;
    fx.store
        .insert_catalog_record(CatalogRecord::new("ORPHAN", "UPC-UNKNOWN"))
        .await;

    let unknown = fx.admit("CT-1", "NEVER-SYNCED").await.unwrap_err();
    let unmapped = fx.admit("CT-1", "ORPHAN").await.unwrap_err();

    assert!(matches!(unknown, ScanError::UnknownCode(_)));
    assert!(unknown.is_retryable());
    assert!(matches!(unmapped, ScanError::UnmappedUpc(ref upc) if upc == "UPC-UNKNOWN"));
}

#[tokio::test]
async fn test_latest_catalog_record_decides_sku() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 1)]).await;
    fx.store
        .insert_catalog_record(
            CatalogRecord::new("Q1", "UPC-SKU-B").synced_at(Utc::now() - Duration::hours(2)),
        )
        .await;
    fx.store
        .insert_catalog_record(CatalogRecord::new("Q1", "UPC-SKU-A"))
        .await;

    let scan = fx.admit("CT-1", "Q1").await.unwrap();

    assert_eq!(scan.sku.as_str(), "SKU-A");
    assert_eq!(scan.upc.as_str(), "UPC-SKU-A");
}

#[tokio::test]
async fn test_unknown_carton_and_blank_input() {
    let fx = Fixture::new().await;
    let token = fx.label("A1", "SKU-A").await;

    let missing = fx.admit("CT-404", &token).await.unwrap_err();
    let blank = fx.admit("CT-1", "   ").await.unwrap_err();

    assert!(matches!(missing, ScanError::NotFound { entity: "carton", .. }));
    assert!(matches!(blank, ScanError::Validation(_)));
}

#[tokio::test]
async fn test_terminal_carton_rejects_scans() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 2)]).await;
    let tokens = fx.labels("A", "SKU-A", 2).await;
    fx.admit("CT-1", &tokens[0]).await.unwrap();
    fx.cancel_carton("CT-1").await;

    let err = fx.admit("CT-1", &tokens[1]).await.unwrap_err();

    assert!(matches!(err, ScanError::InvalidState(_)));
    assert_eq!(fx.scanned("CT-1", "SKU-A").await, 1);
}

#[tokio::test]
async fn test_delete_scan_releases_quota() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 1)]).await;
    let token = fx.label("A1", "SKU-A").await;

    let scan = fx.admit("CT-1", &token).await.unwrap();
    fx.service.delete_scan(scan.id).await.unwrap();
    assert_eq!(fx.scanned("CT-1", "SKU-A").await, 0);

    fx.admit("CT-1", &token).await.unwrap();
    assert_eq!(fx.scanned("CT-1", "SKU-A").await, 1);
}

#[tokio::test]
async fn test_delete_scan_on_finalized_carton_is_locked() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 1)]).await;
    let token = fx.label("A1", "SKU-A").await;
    let scan = fx.admit("CT-1", &token).await.unwrap();
    fx.service
        .finalize(FinalizeCartonCommand::confirm("CT-1"))
        .await
        .unwrap();

    let err = fx.service.delete_scan(scan.id).await.unwrap_err();

    assert!(matches!(err, ScanError::LockedState(_)));
    assert_eq!(fx.scanned("CT-1", "SKU-A").await, 1);
}

#[tokio::test]
async fn test_delete_unknown_scan() {
    let fx = Fixture::new().await;

    let err = fx
        .service
        .delete_scan(sc_recon::domain::value_objects::ScanId::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::NotFound { entity: "scan", .. }));
}

#[tokio::test]
async fn test_progress_and_preview() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 2), ("SKU-B", 2)]).await;
    let a = fx.label("https://qr.example.com/q/A1/", "SKU-A").await;
    let b = fx.label("B1", "SKU-B").await;
    fx.admit("CT-1", &a).await.unwrap();
    fx.admit("CT-1", &b).await.unwrap();

    let progress = fx.service.carton_progress(&"CT-1".into()).await.unwrap();
    assert_eq!(progress.total_expected, 4);
    assert_eq!(progress.total_scanned, 2);
    assert_eq!(progress.percent(), 50.0);
    assert!(!progress.is_complete());
    assert_eq!(progress.line("SKU-B").unwrap().remaining, 1);

    let preview = fx.service.preview_qr(&QrToken::new(a.as_str())).await.unwrap();
    assert_eq!(preview.bare_code, "A1");
    assert_eq!(preview.resolution.sku.as_str(), "SKU-A");
    assert_eq!(preview.sku.unwrap().description, "Classic Clog");
}

#[tokio::test]
async fn test_scan_statistics() {
    let fx = Fixture::new().await;
    let empty = fx.service.scan_statistics().await.unwrap();
    assert_eq!(empty.total_scans, 0);

    fx.started_carton("CT-1", &[("SKU-A", 2), ("SKU-B", 1)]).await;
    fx.started_carton("CT-2", &[("SKU-A", 1)]).await;
    let a = fx.labels("A", "SKU-A", 3).await;
    let b = fx.label("B1", "SKU-B").await;
    fx.admit("CT-1", &a[0]).await.unwrap();
    fx.admit("CT-1", &a[1]).await.unwrap();
    fx.admit("CT-1", &b).await.unwrap();
    fx.admit("CT-2", &a[2]).await.unwrap();
    fx.admit("CT-1", &a[0]).await.unwrap_err();

    let stats = fx.service.scan_statistics().await.unwrap();
    assert_eq!(stats.total_cartons, 2);
    assert_eq!(stats.total_scans, 4);
    assert_eq!(stats.distinct_skus, 2);
    assert_eq!(stats.validated, 4);
    assert_eq!(stats.duplicate + stats.sku_mismatch + stats.error, 0);
}
