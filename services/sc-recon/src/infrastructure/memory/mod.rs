//! 内存存储
//!
//! 与 PostgreSQL 实现语义一致的工作单元：同一时刻只有一个工作单元持有存储，
//! 事务内修改快照副本，提交时整体写回，保存点即快照栈。唯一约束与外键按表结构模拟。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use recon_errors::{AppError, AppResult};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::entities::{
    BoxScan, Carton, CatalogRecord, PackedBox, PurchaseOrder, Scan, Sku, SkuPlanLine,
};
use crate::domain::enums::{CartonStatus, ScanStatus};
use crate::domain::repositories::{
    BoxRepository, BoxScanRepository, CartonRepository, CatalogRepository, LedgerRepository,
    MasterDataRepository, ReleaseOutcome, ReserveOutcome, ScanRepository, ScanStatistics,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::value_objects::{
    BoxId, BoxScanId, CartonId, PoNumber, QrToken, ScanId, SkuCode, Upc,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    purchase_orders: HashMap<PoNumber, PurchaseOrder>,
    skus: HashMap<SkuCode, Sku>,
    upc_mappings: HashMap<Upc, SkuCode>,
    catalog: Vec<CatalogRecord>,
    cartons: BTreeMap<CartonId, Carton>,
    plan_lines: BTreeMap<(CartonId, SkuCode), SkuPlanLine>,
    scans: BTreeMap<ScanId, Scan>,
    boxes: HashMap<BoxId, PackedBox>,
    box_scans: BTreeMap<BoxScanId, BoxScan>,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unique_violation(constraint: &str) -> AppError {
    AppError::conflict(format!("unique constraint {} violated", constraint))
}

fn foreign_key_violation(constraint: &str) -> AppError {
    AppError::validation(format!("foreign key {} violated", constraint))
}

/// 内存存储，克隆后共享同一份数据
#[derive(Clone, Default)]
pub struct MemoryStore {
    gate: Arc<AsyncMutex<()>>,
    committed: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn seed(&self, f: impl FnOnce(&mut MemoryState)) {
        let _permit = self.gate.lock().await;
        f(&mut lock(&self.committed));
    }

    pub async fn insert_purchase_order(&self, po: PurchaseOrder) {
        self.seed(|s| {
            s.purchase_orders.insert(po.number.clone(), po);
        })
        .await;
    }

    pub async fn insert_sku(&self, sku: Sku) {
        self.seed(|s| {
            s.skus.insert(sku.code.clone(), sku);
        })
        .await;
    }

    pub async fn map_upc(&self, upc: impl Into<Upc>, sku: impl Into<SkuCode>) {
        let (upc, sku) = (upc.into(), sku.into());
        self.seed(|s| {
            s.upc_mappings.insert(upc, sku);
        })
        .await;
    }

    /// 模拟外部同步写入一条目录记录
    pub async fn insert_catalog_record(&self, record: CatalogRecord) {
        self.seed(|s| s.catalog.push(record)).await;
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let permit = self.gate.clone().lock_owned().await;
        let snapshot = lock(&self.committed).clone();
        Ok(Box::new(MemoryUnitOfWork {
            _permit: permit,
            committed: self.committed.clone(),
            repos: MemoryRepos {
                state: Mutex::new(snapshot),
            },
            savepoints: Mutex::new(Vec::new()),
        }))
    }
}

/// 内存工作单元，未提交即丢弃
pub struct MemoryUnitOfWork {
    _permit: OwnedMutexGuard<()>,
    committed: Arc<Mutex<MemoryState>>,
    repos: MemoryRepos,
    savepoints: Mutex<Vec<(String, MemoryState)>>,
}

impl MemoryUnitOfWork {
    fn savepoints(&self) -> MutexGuard<'_, Vec<(String, MemoryState)>> {
        self.savepoints.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find_savepoint(stack: &[(String, MemoryState)], name: &str) -> AppResult<usize> {
        stack
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| AppError::internal(format!("savepoint {} does not exist", name)))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn cartons(&self) -> &dyn CartonRepository {
        &self.repos
    }

    fn ledger(&self) -> &dyn LedgerRepository {
        &self.repos
    }

    fn scans(&self) -> &dyn ScanRepository {
        &self.repos
    }

    fn boxes(&self) -> &dyn BoxRepository {
        &self.repos
    }

    fn box_scans(&self) -> &dyn BoxScanRepository {
        &self.repos
    }

    fn catalog(&self) -> &dyn CatalogRepository {
        &self.repos
    }

    fn master_data(&self) -> &dyn MasterDataRepository {
        &self.repos
    }

    async fn savepoint(&self, name: &str) -> AppResult<()> {
        let snapshot = lock(&self.repos.state).clone();
        self.savepoints().push((name.to_string(), snapshot));
        Ok(())
    }

    async fn rollback_to_savepoint(&self, name: &str) -> AppResult<()> {
        let mut stack = self.savepoints();
        let index = Self::find_savepoint(&stack, name)?;
        stack.truncate(index + 1);
        *lock(&self.repos.state) = stack[index].1.clone();
        Ok(())
    }

    async fn release_savepoint(&self, name: &str) -> AppResult<()> {
        let mut stack = self.savepoints();
        let index = Self::find_savepoint(&stack, name)?;
        stack.truncate(index);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        let state = this
            .repos
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        *lock(&this.committed) = state;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

/// 所有仓储共用一份事务内状态
struct MemoryRepos {
    state: Mutex<MemoryState>,
}

impl MemoryRepos {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }
}

// =============================================================================
// CartonRepository
// =============================================================================

#[async_trait]
impl CartonRepository for MemoryRepos {
    async fn find_by_id(&self, id: &CartonId) -> AppResult<Option<Carton>> {
        Ok(self.state().cartons.get(id).cloned())
    }

    async fn lock_by_id(&self, id: &CartonId) -> AppResult<Option<Carton>> {
        // 工作单元独占存储，读取即锁定
        Ok(self.state().cartons.get(id).cloned())
    }

    async fn insert(&self, carton: &Carton, plan: &[SkuPlanLine]) -> AppResult<()> {
        let mut state = self.state();
        if state.cartons.contains_key(&carton.id) {
            return Err(unique_violation("cartons_pkey"));
        }
        if !state.purchase_orders.contains_key(&carton.po_number) {
            return Err(foreign_key_violation("cartons_po_number_fkey"));
        }
        if plan.iter().any(|l| !state.skus.contains_key(&l.sku)) {
            return Err(foreign_key_violation("carton_sku_plans_sku_code_fkey"));
        }
        state.cartons.insert(carton.id.clone(), carton.clone());
        for line in plan {
            state
                .plan_lines
                .insert((line.carton_id.clone(), line.sku.clone()), line.clone());
        }
        Ok(())
    }

    async fn update_status(&self, id: &CartonId, status: CartonStatus) -> AppResult<()> {
        let mut state = self.state();
        let carton = state
            .cartons
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("carton {}", id)))?;
        carton.status = status;
        carton.updated_at = chrono::Utc::now();
        Ok(())
    }
}

// =============================================================================
// LedgerRepository
// =============================================================================

#[async_trait]
impl LedgerRepository for MemoryRepos {
    async fn plan_lines(&self, carton_id: &CartonId) -> AppResult<Vec<SkuPlanLine>> {
        Ok(self
            .state()
            .plan_lines
            .values()
            .filter(|l| &l.carton_id == carton_id)
            .cloned()
            .collect())
    }

    async fn find_line(
        &self,
        carton_id: &CartonId,
        sku: &SkuCode,
    ) -> AppResult<Option<SkuPlanLine>> {
        Ok(self
            .state()
            .plan_lines
            .get(&(carton_id.clone(), sku.clone()))
            .cloned())
    }

    async fn reserve_one(&self, carton_id: &CartonId, sku: &SkuCode) -> AppResult<ReserveOutcome> {
        let mut state = self.state();
        let Some(line) = state.plan_lines.get_mut(&(carton_id.clone(), sku.clone())) else {
            return Ok(ReserveOutcome::NotPlanned);
        };
        if !line.has_room() {
            return Ok(ReserveOutcome::Exhausted {
                expected: line.expected,
                scanned: line.scanned,
            });
        }
        line.scanned += 1;
        Ok(ReserveOutcome::Reserved(line.clone()))
    }

    async fn release_one(&self, carton_id: &CartonId, sku: &SkuCode) -> AppResult<ReleaseOutcome> {
        let mut state = self.state();
        if let Some(carton) = state.cartons.get(carton_id) {
            if carton.status.is_terminal() {
                return Ok(ReleaseOutcome::Locked(carton.status));
            }
        }
        let Some(line) = state.plan_lines.get_mut(&(carton_id.clone(), sku.clone())) else {
            return Ok(ReleaseOutcome::NotPlanned);
        };
        if line.scanned == 0 {
            return Ok(ReleaseOutcome::NothingToRelease);
        }
        line.scanned -= 1;
        Ok(ReleaseOutcome::Released(line.clone()))
    }
}

// =============================================================================
// ScanRepository
// =============================================================================

#[async_trait]
impl ScanRepository for MemoryRepos {
    async fn find_by_id(&self, id: &ScanId) -> AppResult<Option<Scan>> {
        Ok(self.state().scans.get(id).cloned())
    }

    async fn find_by_carton_and_token(
        &self,
        carton_id: &CartonId,
        qr_token: &QrToken,
    ) -> AppResult<Option<Scan>> {
        Ok(self
            .state()
            .scans
            .values()
            .find(|s| &s.carton_id == carton_id && &s.qr_token == qr_token)
            .cloned())
    }

    async fn insert(&self, scan: &Scan) -> AppResult<()> {
        let mut state = self.state();
        if !state.cartons.contains_key(&scan.carton_id) {
            return Err(foreign_key_violation("scans_carton_id_fkey"));
        }
        if state
            .scans
            .values()
            .any(|s| s.carton_id == scan.carton_id && s.qr_token == scan.qr_token)
        {
            return Err(unique_violation("scans_carton_qr_key"));
        }
        state.scans.insert(scan.id, scan.clone());
        Ok(())
    }

    async fn delete(&self, id: &ScanId) -> AppResult<bool> {
        Ok(self.state().scans.remove(id).is_some())
    }

    async fn list_by_carton(&self, carton_id: &CartonId) -> AppResult<Vec<Scan>> {
        let mut scans: Vec<Scan> = self
            .state()
            .scans
            .values()
            .filter(|s| &s.carton_id == carton_id)
            .cloned()
            .collect();
        scans.sort_by(|a, b| a.scanned_at.cmp(&b.scanned_at).then(a.id.cmp(&b.id)));
        Ok(scans)
    }

    async fn statistics(&self) -> AppResult<ScanStatistics> {
        let state = self.state();
        let mut cartons = HashSet::new();
        let mut skus = HashSet::new();
        let mut stats = ScanStatistics::default();
        for scan in state.scans.values() {
            cartons.insert(&scan.carton_id);
            skus.insert(&scan.sku);
            stats.total_scans += 1;
            match scan.status {
                ScanStatus::Validated => stats.validated += 1,
                ScanStatus::Duplicate => stats.duplicate += 1,
                ScanStatus::SkuMismatch => stats.sku_mismatch += 1,
                ScanStatus::Error => stats.error += 1,
            }
        }
        stats.total_cartons = cartons.len() as u64;
        stats.distinct_skus = skus.len() as u64;
        Ok(stats)
    }
}

// =============================================================================
// BoxRepository / BoxScanRepository
// =============================================================================

#[async_trait]
impl BoxRepository for MemoryRepos {
    async fn find_by_id(&self, id: &BoxId) -> AppResult<Option<PackedBox>> {
        Ok(self.state().boxes.get(id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<PackedBox>> {
        Ok(self
            .state()
            .boxes
            .values()
            .find(|b| b.code == code)
            .cloned())
    }

    async fn lock_by_id(&self, id: &BoxId) -> AppResult<Option<PackedBox>> {
        Ok(self.state().boxes.get(id).cloned())
    }

    async fn lock_by_code(&self, code: &str) -> AppResult<Option<PackedBox>> {
        Ok(self
            .state()
            .boxes
            .values()
            .find(|b| b.code == code)
            .cloned())
    }

    async fn insert(&self, packed_box: &PackedBox) -> AppResult<()> {
        let mut state = self.state();
        if state.boxes.values().any(|b| b.code == packed_box.code) {
            return Err(unique_violation("boxes_box_code_key"));
        }
        if !state.skus.contains_key(&packed_box.descriptor.sku) {
            return Err(foreign_key_violation("boxes_sku_code_fkey"));
        }
        if let Some(carton_id) = &packed_box.carton_id {
            if !state.cartons.contains_key(carton_id) {
                return Err(foreign_key_violation("boxes_carton_id_fkey"));
            }
        }
        state.boxes.insert(packed_box.id, packed_box.clone());
        Ok(())
    }

    async fn update(&self, packed_box: &PackedBox) -> AppResult<()> {
        let mut state = self.state();
        let existing = state
            .boxes
            .get_mut(&packed_box.id)
            .ok_or_else(|| AppError::not_found(format!("box {}", packed_box.id)))?;
        existing.carton_id = packed_box.carton_id.clone();
        existing.validated = packed_box.validated;
        existing.status = packed_box.status;
        existing.updated_at = packed_box.updated_at;
        Ok(())
    }

    async fn list_by_carton(&self, carton_id: &CartonId) -> AppResult<Vec<PackedBox>> {
        let mut boxes: Vec<PackedBox> = self
            .state()
            .boxes
            .values()
            .filter(|b| b.carton_id.as_ref() == Some(carton_id))
            .cloned()
            .collect();
        boxes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.code.cmp(&b.code)));
        Ok(boxes)
    }
}

#[async_trait]
impl BoxScanRepository for MemoryRepos {
    async fn find_by_id(&self, id: &BoxScanId) -> AppResult<Option<BoxScan>> {
        Ok(self.state().box_scans.get(id).cloned())
    }

    async fn find_by_box_and_token(
        &self,
        box_id: &BoxId,
        qr_token: &QrToken,
    ) -> AppResult<Option<BoxScan>> {
        Ok(self
            .state()
            .box_scans
            .values()
            .find(|s| &s.box_id == box_id && &s.qr_token == qr_token)
            .cloned())
    }

    async fn insert(&self, scan: &BoxScan) -> AppResult<()> {
        let mut state = self.state();
        if !state.boxes.contains_key(&scan.box_id) {
            return Err(foreign_key_violation("box_scans_box_id_fkey"));
        }
        if state
            .box_scans
            .values()
            .any(|s| s.box_id == scan.box_id && s.qr_token == scan.qr_token)
        {
            return Err(unique_violation("box_scans_box_qr_key"));
        }
        state.box_scans.insert(scan.id, scan.clone());
        Ok(())
    }

    async fn delete(&self, id: &BoxScanId) -> AppResult<bool> {
        Ok(self.state().box_scans.remove(id).is_some())
    }

    async fn list_by_box(&self, box_id: &BoxId) -> AppResult<Vec<BoxScan>> {
        let mut scans: Vec<BoxScan> = self
            .state()
            .box_scans
            .values()
            .filter(|s| &s.box_id == box_id)
            .cloned()
            .collect();
        scans.sort_by(|a, b| a.scanned_at.cmp(&b.scanned_at).then(a.id.cmp(&b.id)));
        Ok(scans)
    }

    async fn count_matching(&self, box_id: &BoxId) -> AppResult<u32> {
        Ok(self
            .state()
            .box_scans
            .values()
            .filter(|s| &s.box_id == box_id && s.is_match())
            .count() as u32)
    }
}

// =============================================================================
// CatalogRepository / MasterDataRepository
// =============================================================================

#[async_trait]
impl CatalogRepository for MemoryRepos {
    async fn latest_record(&self, qr_token: &QrToken) -> AppResult<Option<CatalogRecord>> {
        Ok(self
            .state()
            .catalog
            .iter()
            .enumerate()
            .filter(|(_, r)| &r.qr_token == qr_token)
            .max_by_key(|(index, r)| (r.synced_at, *index))
            .map(|(_, r)| r.clone()))
    }

    async fn sku_for_upc(&self, upc: &Upc) -> AppResult<Option<SkuCode>> {
        Ok(self.state().upc_mappings.get(upc).cloned())
    }
}

#[async_trait]
impl MasterDataRepository for MemoryRepos {
    async fn find_purchase_order(&self, number: &PoNumber) -> AppResult<Option<PurchaseOrder>> {
        Ok(self.state().purchase_orders.get(number).cloned())
    }

    async fn find_sku(&self, code: &SkuCode) -> AppResult<Option<Sku>> {
        Ok(self.state().skus.get(code).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::BoxDescriptor;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_purchase_order(PurchaseOrder::new("PO-1", "Acme")).await;
        store.insert_sku(Sku::new("SKU-A", "Clog")).await;
        store
    }

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() {
        let store = seeded().await;
        let carton = Carton::new("CT-1".into(), "PO-1".into(), 1);
        let plan = vec![SkuPlanLine::new("CT-1".into(), "SKU-A".into(), 1)];

        let uow = store.begin().await.unwrap();
        uow.cartons().insert(&carton, &plan).await.unwrap();
        uow.rollback().await.unwrap();

        let uow = store.begin().await.unwrap();
        assert!(uow.cartons().find_by_id(&carton.id).await.unwrap().is_none());
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_savepoint_rollback_restores_ledger() {
        let store = seeded().await;
        let carton = Carton::new("CT-1".into(), "PO-1".into(), 2);
        let plan = vec![SkuPlanLine::new("CT-1".into(), "SKU-A".into(), 2)];
        let sku = SkuCode::new("SKU-A");

        let uow = store.begin().await.unwrap();
        uow.cartons().insert(&carton, &plan).await.unwrap();
        uow.ledger().reserve_one(&carton.id, &sku).await.unwrap();

        uow.savepoint("item_0").await.unwrap();
        uow.ledger().reserve_one(&carton.id, &sku).await.unwrap();
        uow.rollback_to_savepoint("item_0").await.unwrap();
        uow.release_savepoint("item_0").await.unwrap();

        let line = uow.ledger().find_line(&carton.id, &sku).await.unwrap().unwrap();
        assert_eq!(line.scanned, 1);
        assert!(uow.release_savepoint("item_0").await.is_err());
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_reserve_stops_at_expected() {
        let store = seeded().await;
        let carton = Carton::new("CT-1".into(), "PO-1".into(), 1);
        let plan = vec![SkuPlanLine::new("CT-1".into(), "SKU-A".into(), 1)];
        let sku = SkuCode::new("SKU-A");

        let uow = store.begin().await.unwrap();
        uow.cartons().insert(&carton, &plan).await.unwrap();
        assert!(matches!(
            uow.ledger().reserve_one(&carton.id, &sku).await.unwrap(),
            ReserveOutcome::Reserved(_)
        ));
        assert_eq!(
            uow.ledger().reserve_one(&carton.id, &sku).await.unwrap(),
            ReserveOutcome::Exhausted {
                expected: 1,
                scanned: 1
            }
        );
        assert_eq!(
            uow.ledger()
                .reserve_one(&carton.id, &SkuCode::new("SKU-Z"))
                .await
                .unwrap(),
            ReserveOutcome::NotPlanned
        );
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_carton_is_conflict() {
        let store = seeded().await;
        let carton = Carton::new("CT-1".into(), "PO-1".into(), 1);
        let plan = vec![SkuPlanLine::new("CT-1".into(), "SKU-A".into(), 1)];

        let uow = store.begin().await.unwrap();
        uow.cartons().insert(&carton, &plan).await.unwrap();
        let err = uow.cartons().insert(&carton, &plan).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_box_sku_must_exist() {
        let store = seeded().await;
        let unknown = PackedBox::new(
            "150325$SKU-Z$1$1",
            BoxDescriptor::parse("150325$SKU-Z$1$1").unwrap(),
        );
        let known = PackedBox::new(
            "150325$SKU-A$1$1",
            BoxDescriptor::parse("150325$SKU-A$1$1").unwrap(),
        );

        let uow = store.begin().await.unwrap();
        let err = uow.boxes().insert(&unknown).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        uow.boxes().insert(&known).await.unwrap();
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_latest_catalog_record_wins() {
        let store = seeded().await;
        let earlier = chrono::Utc::now() - chrono::Duration::hours(1);
        store
            .insert_catalog_record(CatalogRecord::new("Q1", "UPC-OLD").synced_at(earlier))
            .await;
        store.insert_catalog_record(CatalogRecord::new("Q1", "UPC-NEW")).await;

        let uow = store.begin().await.unwrap();
        let record = uow
            .catalog()
            .latest_record(&QrToken::new("Q1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.upc.as_str(), "UPC-NEW");
        uow.rollback().await.unwrap();
    }
}
