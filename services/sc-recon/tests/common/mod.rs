//! 集成测试公共夹具
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sc_recon::application::{
    AdmitBoxScanCommand, AdmitScanCommand, BoxRef, CreateCartonCommand, FinalizeCartonCommand,
    LifecycleSettings, PlanLineInput, RegisterBoxCommand,
};
use sc_recon::domain::entities::{CatalogRecord, PackedBox, PurchaseOrder, Scan, Sku};
use sc_recon::domain::services::{ShipmentGateway, ShipmentLine, ShipmentReceipt};
use sc_recon::infrastructure::memory::MemoryStore;
use sc_recon::{ReconService, ScanError};
use serde_json::json;

pub const PO: &str = "PO-1";

/// 外部出货系统调用记录
#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentCall {
    Confirm(Vec<ShipmentLine>),
    Cancel(Vec<String>),
}

/// 记录调用的出货网关，可切换为失败或延迟应答
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<ShipmentCall>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingGateway {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<ShipmentCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, call: ShipmentCall) -> Result<ShipmentReceipt, ScanError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            let payload = json!({"success": "false", "message": "PO locked upstream"});
            return Err(ScanError::External {
                message: "shipment service rejected request".into(),
                payload: Some(payload),
                timed_out: false,
            });
        }
        self.calls.lock().unwrap().push(call);
        Ok(ShipmentReceipt {
            payload: json!({"success": true}),
        })
    }
}

#[async_trait]
impl ShipmentGateway for RecordingGateway {
    async fn confirm(&self, lines: &[ShipmentLine]) -> Result<ShipmentReceipt, ScanError> {
        self.answer(ShipmentCall::Confirm(lines.to_vec())).await
    }

    async fn cancel(&self, codes: &[String]) -> Result<ShipmentReceipt, ScanError> {
        self.answer(ShipmentCall::Cancel(codes.to_vec())).await
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub gateway: Arc<RecordingGateway>,
    pub service: ReconService,
}

impl Fixture {
    /// 预置采购单 PO-1 与 SKU-A / SKU-B / SKU-C，每个 SKU 映射 UPC-{SKU}
    pub async fn new() -> Self {
        Self::with_settings(LifecycleSettings::default()).await
    }

    pub async fn with_settings(settings: LifecycleSettings) -> Self {
        let store = MemoryStore::new();
        store.insert_purchase_order(PurchaseOrder::new(PO, "Acme Footwear")).await;
        store
            .insert_sku(Sku::new("SKU-A", "Classic Clog").with_color("BLK").with_size("M10"))
            .await;
        store.insert_sku(Sku::new("SKU-B", "Slide")).await;
        store.insert_sku(Sku::new("SKU-C", "Sandal").with_color("WHT")).await;
        for sku in ["SKU-A", "SKU-B", "SKU-C"] {
            store.map_upc(format!("UPC-{}", sku), sku).await;
        }

        let gateway = Arc::new(RecordingGateway::default());
        let service = ReconService::new(Arc::new(store.clone()), gateway.clone(), settings);

        Self {
            store,
            gateway,
            service,
        }
    }

    /// 登记一个指向 `sku` 的二维码并返回令牌
    pub async fn label(&self, token: &str, sku: &str) -> String {
        self.store
            .insert_catalog_record(CatalogRecord::new(token, format!("UPC-{}", sku)))
            .await;
        token.to_string()
    }

    /// 批量登记 `{prefix}{n}` 形式的令牌
    pub async fn labels(&self, prefix: &str, sku: &str, count: usize) -> Vec<String> {
        let mut tokens = Vec::with_capacity(count);
        for n in 1..=count {
            tokens.push(self.label(&format!("{}{}", prefix, n), sku).await);
        }
        tokens
    }

    /// 创建装箱（PENDING）
    pub async fn carton(&self, id: &str, lines: &[(&str, u32)]) {
        let lines = lines
            .iter()
            .map(|(sku, qty)| PlanLineInput::new(*sku, *qty))
            .collect();
        self.service
            .create_carton(CreateCartonCommand::new(id, PO, lines))
            .await
            .expect("create carton");
    }

    /// 创建并开始装箱（IN_PROGRESS）
    pub async fn started_carton(&self, id: &str, lines: &[(&str, u32)]) {
        self.carton(id, lines).await;
        self.service.start(&id.into()).await.expect("start carton");
    }

    pub async fn admit(&self, carton: &str, token: &str) -> Result<Scan, ScanError> {
        self.service
            .admit(AdmitScanCommand::new(carton, token))
            .await
    }

    pub async fn cancel_carton(&self, carton: &str) {
        self.service
            .finalize(FinalizeCartonCommand::cancel(carton))
            .await
            .expect("cancel carton");
    }

    pub async fn register_box(&self, code: &str) -> PackedBox {
        self.service
            .register_box(RegisterBoxCommand::new(code))
            .await
            .expect("register box")
    }

    /// 登记箱子并扫满 `tokens`
    pub async fn filled_box(&self, code: &str, tokens: &[String]) -> PackedBox {
        let packed_box = self.register_box(code).await;
        self.fill_box(&packed_box, tokens).await;
        packed_box
    }

    pub async fn fill_box(&self, packed_box: &PackedBox, tokens: &[String]) {
        for token in tokens {
            self.service
                .admit_to_box(AdmitBoxScanCommand::new(BoxRef::Id(packed_box.id), token.as_str()))
                .await
                .expect("box scan");
        }
    }

    pub async fn scanned(&self, carton: &str, sku: &str) -> u32 {
        self.service
            .carton_progress(&carton.into())
            .await
            .expect("progress")
            .line(sku)
            .map(|l| l.scanned)
            .unwrap_or_default()
    }
}
