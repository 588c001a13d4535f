//! 箱码解析与箱内扫描测试

mod common;

use common::Fixture;
use sc_recon::ScanError;
use sc_recon::application::{AdmitBoxScanCommand, BoxRef, RegisterBoxCommand};
use sc_recon::domain::enums::{BoxStatus, ScanStatus};

const BOX_CODE: &str = "150325$SKU-A$2$1";

fn box_scan(target: BoxRef, token: &str) -> AdmitBoxScanCommand {
    AdmitBoxScanCommand::new(target, token)
}

#[tokio::test]
async fn test_register_parses_code() {
    let fx = Fixture::new().await;

    let packed_box = fx.register_box(" 150325$SKU-A$12$3 ").await;

    assert_eq!(packed_box.code, "150325$SKU-A$12$3");
    assert_eq!(packed_box.descriptor.iso_date(), "2025-03-15");
    assert_eq!(packed_box.expected_units(), 12);
    assert_eq!(packed_box.descriptor.sequence, 3);
    assert_eq!(packed_box.status, BoxStatus::Pending);
    assert!(!packed_box.validated);
}

#[tokio::test]
async fn test_register_rejects_bad_and_duplicate_codes() {
    let fx = Fixture::new().await;
    fx.register_box(BOX_CODE).await;

    let malformed = fx
        .service
        .register_box(RegisterBoxCommand::new("150325$SKU-A$2"))
        .await
        .unwrap_err();
    let duplicate = fx
        .service
        .register_box(RegisterBoxCommand::new(BOX_CODE))
        .await
        .unwrap_err();

    assert!(matches!(malformed, ScanError::MalformedCode(_)));
    assert!(matches!(duplicate, ScanError::Conflict(_)));
    assert!(fx.service.parse_box_code("311325$X$1$1").is_err());
}

#[tokio::test]
async fn test_register_requires_known_sku() {
    let fx = Fixture::new().await;

    let err = fx
        .service
        .register_box(RegisterBoxCommand::new("150325$NO-SUCH-SKU$2$1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::NotFound { entity: "sku", .. }));
    let lookup = fx
        .service
        .box_progress(&BoxRef::Code("150325$NO-SUCH-SKU$2$1".into()))
        .await
        .unwrap_err();
    assert!(matches!(lookup, ScanError::NotFound { entity: "box", .. }));
}

#[tokio::test]
async fn test_register_for_carton_checks_carton() {
    let fx = Fixture::new().await;

    let missing = fx
        .service
        .register_box(RegisterBoxCommand::new(BOX_CODE).for_carton("CT-404"))
        .await
        .unwrap_err();
    assert!(matches!(missing, ScanError::NotFound { entity: "carton", .. }));

    fx.started_carton("CT-1", &[("SKU-A", 2)]).await;
    let packed_box = fx
        .service
        .register_box(RegisterBoxCommand::new(BOX_CODE).for_carton("CT-1"))
        .await
        .unwrap();
    assert_eq!(packed_box.carton_id.unwrap().as_str(), "CT-1");
}

#[tokio::test]
async fn test_box_validates_when_matching_count_reached() {
    let fx = Fixture::new().await;
    let packed_box = fx.register_box(BOX_CODE).await;
    let target = BoxRef::Id(packed_box.id);
    let a = fx.labels("A", "SKU-A", 3).await;
    let b = fx.label("B1", "SKU-B").await;

    let mismatch = fx.service.admit_to_box(box_scan(target.clone(), &b)).await.unwrap();
    assert_eq!(mismatch.scan.status, ScanStatus::SkuMismatch);
    assert_eq!(mismatch.matching_units, 0);

    let first = fx.service.admit_to_box(box_scan(target.clone(), &a[0])).await.unwrap();
    assert!(!first.box_validated);

    let second = fx.service.admit_to_box(box_scan(target.clone(), &a[1])).await.unwrap();
    assert!(second.box_validated);
    assert_eq!(second.matching_units, 2);
    assert_eq!(second.expected_units, 2);

    let closed = fx.service.admit_to_box(box_scan(target.clone(), &a[2])).await.unwrap_err();
    assert!(matches!(closed, ScanError::InvalidState(_)));

    let progress = fx.service.box_progress(&target).await.unwrap();
    assert_eq!(progress.matching_units, 2);
    assert_eq!(progress.mismatched_units, 1);
    assert_eq!(progress.packed_box.status, BoxStatus::Validated);
}

#[tokio::test]
async fn test_box_scan_by_code_and_duplicates() {
    let fx = Fixture::new().await;
    fx.register_box(BOX_CODE).await;
    let target = BoxRef::Code(BOX_CODE.to_string());
    let token = fx.label("A1", "SKU-A").await;

    fx.service.admit_to_box(box_scan(target.clone(), &token)).await.unwrap();
    let err = fx.service.admit_to_box(box_scan(target.clone(), &token)).await.unwrap_err();

    assert!(matches!(err, ScanError::DuplicateScan { .. }));
    let progress = fx.service.box_progress(&target).await.unwrap();
    assert_eq!(progress.scans.len(), 1);
}

#[tokio::test]
async fn test_label_upc_must_match_catalog() {
    let fx = Fixture::new().await;
    let packed_box = fx.register_box(BOX_CODE).await;
    let token = fx.label("A1", "SKU-A").await;

    let err = fx
        .service
        .admit_to_box(box_scan(BoxRef::Id(packed_box.id), &token).with_upc("UPC-SKU-B"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScanError::UpcMismatch { ref expected, ref received }
            if expected == "UPC-SKU-A" && received == "UPC-SKU-B"
    ));

    fx.service
        .admit_to_box(box_scan(BoxRef::Id(packed_box.id), &token).with_upc("UPC-SKU-A"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_box() {
    let fx = Fixture::new().await;
    let token = fx.label("A1", "SKU-A").await;

    let err = fx
        .service
        .admit_to_box(box_scan(BoxRef::Code("010125$SKU-A$1$1".into()), &token))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::NotFound { entity: "box", .. }));
}

#[tokio::test]
async fn test_delete_box_scan() {
    let fx = Fixture::new().await;
    let packed_box = fx.register_box(BOX_CODE).await;
    let a = fx.labels("A", "SKU-A", 2).await;

    let first = fx
        .service
        .admit_to_box(box_scan(BoxRef::Id(packed_box.id), &a[0]))
        .await
        .unwrap();
    fx.service.delete_box_scan(first.scan.id).await.unwrap();

    let readmitted = fx
        .service
        .admit_to_box(box_scan(BoxRef::Id(packed_box.id), &a[0]))
        .await
        .unwrap();
    fx.service
        .admit_to_box(box_scan(BoxRef::Id(packed_box.id), &a[1]))
        .await
        .unwrap();

    let err = fx.service.delete_box_scan(readmitted.scan.id).await.unwrap_err();
    assert!(matches!(err, ScanError::LockedState(_)));
}

#[tokio::test]
async fn test_box_attached_to_finished_carton_rejects_scans() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 2)]).await;
    let packed_box = fx.register_box(BOX_CODE).await;
    fx.service
        .assign_box(packed_box.id, Some("CT-1".into()))
        .await
        .unwrap();
    let a = fx.labels("A", "SKU-A", 2).await;
    fx.admit("CT-1", &a[0]).await.unwrap();
    fx.cancel_carton("CT-1").await;

    let err = fx
        .service
        .admit_to_box(box_scan(BoxRef::Id(packed_box.id), &a[1]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidState(_)));

    let detached = fx.service.assign_box(packed_box.id, None).await.unwrap();
    assert!(detached.carton_id.is_none());
    fx.service
        .admit_to_box(box_scan(BoxRef::Id(packed_box.id), &a[1]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_boxes_for_carton() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 4)]).await;
    fx.started_carton("CT-2", &[("SKU-A", 4)]).await;
    let first = fx
        .service
        .register_box(RegisterBoxCommand::new("150325$SKU-A$2$1").for_carton("CT-1"))
        .await
        .unwrap();
    let second = fx.register_box("150325$SKU-A$2$2").await;
    fx.service
        .assign_box(second.id, Some("CT-1".into()))
        .await
        .unwrap();
    fx.register_box("150325$SKU-A$2$3").await;

    let boxes = fx.service.boxes_for_carton(&"CT-1".into()).await.unwrap();
    let ids: Vec<_> = boxes.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    assert!(fx.service.boxes_for_carton(&"CT-2".into()).await.unwrap().is_empty());
    let missing = fx.service.boxes_for_carton(&"CT-404".into()).await.unwrap_err();
    assert!(matches!(missing, ScanError::NotFound { entity: "carton", .. }));
}
