//! 装箱生命周期与结箱测试

mod common;

use std::time::Duration;

use common::{Fixture, PO, ShipmentCall};
use sc_recon::ScanError;
use sc_recon::application::{
    CreateCartonCommand, FinalizeCartonCommand, LifecycleSettings, PlanLineInput,
};
use sc_recon::domain::enums::{CartonStatus, FinalizeDecision};

#[tokio::test]
async fn test_create_carton_checks_master_data() {
    let fx = Fixture::new().await;

    let unknown_po = fx
        .service
        .create_carton(CreateCartonCommand::new(
            "CT-1",
            "PO-404",
            vec![PlanLineInput::new("SKU-A", 1)],
        ))
        .await
        .unwrap_err();
    let unknown_sku = fx
        .service
        .create_carton(CreateCartonCommand::new(
            "CT-1",
            PO,
            vec![PlanLineInput::new("SKU-Z", 1)],
        ))
        .await
        .unwrap_err();
    let repeated_sku = fx
        .service
        .create_carton(CreateCartonCommand::new(
            "CT-1",
            PO,
            vec![PlanLineInput::new("SKU-A", 1), PlanLineInput::new("SKU-A", 2)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(unknown_po, ScanError::NotFound { entity: "purchase order", .. }));
    assert!(matches!(unknown_sku, ScanError::NotFound { entity: "sku", .. }));
    assert!(matches!(repeated_sku, ScanError::Validation(_)));
}

#[tokio::test]
async fn test_create_carton_is_pending_with_plan() {
    let fx = Fixture::new().await;

    let carton = fx
        .service
        .create_carton(CreateCartonCommand::new(
            "CT-1",
            PO,
            vec![PlanLineInput::new("SKU-A", 2), PlanLineInput::new("SKU-B", 3)],
        ))
        .await
        .unwrap();

    assert_eq!(carton.status, CartonStatus::Pending);
    assert_eq!(carton.total_expected, 5);
    let progress = fx.service.carton_progress(&carton.id).await.unwrap();
    assert_eq!(progress.lines.len(), 2);
    assert_eq!(progress.total_scanned, 0);
}

#[tokio::test]
async fn test_duplicate_carton_id_conflicts() {
    let fx = Fixture::new().await;
    fx.carton("CT-1", &[("SKU-A", 1)]).await;

    let err = fx
        .service
        .create_carton(CreateCartonCommand::new(
            "CT-1",
            PO,
            vec![PlanLineInput::new("SKU-B", 1)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Conflict(_)));
}

#[tokio::test]
async fn test_start_only_from_pending() {
    let fx = Fixture::new().await;
    fx.carton("CT-1", &[("SKU-A", 1)]).await;

    let started = fx.service.start(&"CT-1".into()).await.unwrap();
    let again = fx.service.start(&"CT-1".into()).await.unwrap_err();
    let missing = fx.service.start(&"CT-404".into()).await.unwrap_err();

    assert_eq!(started.status, CartonStatus::InProgress);
    assert!(matches!(again, ScanError::InvalidState(_)));
    assert!(matches!(missing, ScanError::NotFound { .. }));
}

#[tokio::test]
async fn test_finalize_preconditions() {
    let fx = Fixture::new().await;
    fx.carton("CT-1", &[("SKU-A", 1)]).await;
    let token = fx.label("A1", "SKU-A").await;
    fx.admit("CT-1", &token).await.unwrap();

    let pending = fx
        .service
        .finalize(FinalizeCartonCommand::confirm("CT-1"))
        .await
        .unwrap_err();
    assert!(matches!(pending, ScanError::InvalidState(_)));

    fx.started_carton("CT-2", &[("SKU-A", 1)]).await;
    let empty = fx
        .service
        .finalize(FinalizeCartonCommand::confirm("CT-2"))
        .await
        .unwrap_err();
    assert!(matches!(empty, ScanError::InvalidState(_)));
    assert!(fx.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_confirm_submits_grouped_batch() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 2), ("SKU-B", 1)]).await;
    let a1 = fx.label("https://qr.example.com/q/A1", "SKU-A").await;
    let a2 = fx.label("A2", "SKU-A").await;
    let b1 = fx.label("B1", "SKU-B").await;
    for token in [&a1, &a2, &b1] {
        fx.admit("CT-1", token).await.unwrap();
    }

    let outcome = fx
        .service
        .finalize(FinalizeCartonCommand::confirm("CT-1"))
        .await
        .unwrap();

    assert_eq!(outcome.decision, FinalizeDecision::Confirm);
    assert_eq!(outcome.status, CartonStatus::Completed);
    assert_eq!(outcome.units_submitted, 3);

    let calls = fx.gateway.calls();
    let [ShipmentCall::Confirm(lines)] = calls.as_slice() else {
        panic!("expected one confirm call, got {calls:?}");
    };
    assert_eq!(lines.len(), 2);

    let a = &lines[0];
    assert_eq!(a.po_no, PO);
    assert_eq!(a.style_no, "SKU-A");
    assert_eq!(a.style_name, "Classic Clog");
    assert_eq!(a.color, "BLK");
    assert_eq!(a.size, "M10");
    assert_eq!(a.quantity, 2);
    assert_eq!(a.codes, vec!["A1".to_string(), "A2".to_string()]);

    let b = &lines[1];
    assert_eq!(b.color, "N/A");
    assert_eq!(b.size, "M");
    assert_eq!(b.codes, vec!["B1".to_string()]);

    let progress = fx.service.carton_progress(&"CT-1".into()).await.unwrap();
    assert_eq!(progress.carton.status, CartonStatus::Completed);
    assert!(progress.is_complete());
}

#[tokio::test]
async fn test_cancel_submits_bare_codes() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 2)]).await;
    let a1 = fx.label("https://qr.example.com/q/A1/", "SKU-A").await;
    fx.admit("CT-1", &a1).await.unwrap();

    let outcome = fx
        .service
        .finalize(FinalizeCartonCommand::cancel("CT-1"))
        .await
        .unwrap();

    assert_eq!(outcome.status, CartonStatus::Canceled);
    assert_eq!(
        fx.gateway.calls(),
        vec![ShipmentCall::Cancel(vec!["A1".to_string()])]
    );

    let again = fx
        .service
        .finalize(FinalizeCartonCommand::confirm("CT-1"))
        .await
        .unwrap_err();
    assert!(matches!(again, ScanError::InvalidState(_)));
}

#[tokio::test]
async fn test_external_failure_keeps_carton_open() {
    let fx = Fixture::new().await;
    fx.started_carton("CT-1", &[("SKU-A", 1)]).await;
    let token = fx.label("A1", "SKU-A").await;
    fx.admit("CT-1", &token).await.unwrap();
    fx.gateway.set_failing(true);

    let err = fx
        .service
        .finalize(FinalizeCartonCommand::confirm("CT-1"))
        .await
        .unwrap_err();

    match &err {
        ScanError::External {
            payload, timed_out, ..
        } => {
            assert!(!timed_out);
            assert_eq!(payload.as_ref().unwrap()["message"], "PO locked upstream");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.is_retryable());
    let progress = fx.service.carton_progress(&"CT-1".into()).await.unwrap();
    assert_eq!(progress.carton.status, CartonStatus::InProgress);

    fx.gateway.set_failing(false);
    let outcome = fx
        .service
        .finalize(FinalizeCartonCommand::confirm("CT-1"))
        .await
        .unwrap();
    assert_eq!(outcome.status, CartonStatus::Completed);
}

#[tokio::test]
async fn test_shipment_timeout_is_retryable() {
    let fx = Fixture::with_settings(LifecycleSettings {
        shipment_timeout: Duration::from_millis(50),
        ..LifecycleSettings::default()
    })
    .await;
    fx.started_carton("CT-1", &[("SKU-A", 1)]).await;
    let token = fx.label("A1", "SKU-A").await;
    fx.admit("CT-1", &token).await.unwrap();
    fx.gateway.set_delay(Duration::from_millis(500));

    let err = fx
        .service
        .finalize(FinalizeCartonCommand::cancel("CT-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::External { timed_out: true, .. }));
    assert!(err.is_retryable());
    let progress = fx.service.carton_progress(&"CT-1".into()).await.unwrap();
    assert_eq!(progress.carton.status, CartonStatus::InProgress);
}
