//! 对账业务指标

use metrics::{counter, histogram};
use std::time::Duration;

// ============================================================================
// 扫描 Metrics
// ============================================================================

/// 记录装箱扫描结果，`outcome` 为 `accepted` 或错误码
pub fn record_carton_scan(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("recon_carton_scans_total", &labels).increment(1);
}

/// 记录箱内扫描结果
pub fn record_box_scan(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("recon_box_scans_total", &labels).increment(1);
}

/// 记录箱子完成校验
pub fn record_box_validated() {
    counter!("recon_boxes_validated_total").increment(1);
}

// ============================================================================
// 复用 Metrics
// ============================================================================

pub fn record_reuse(created: usize, rejected: usize) {
    counter!("recon_reuse_requests_total").increment(1);
    counter!("recon_reuse_scans_created_total").increment(created as u64);
    counter!("recon_reuse_items_rejected_total").increment(rejected as u64);
}

// ============================================================================
// 结箱 Metrics
// ============================================================================

/// 记录结箱与外部登记耗时
pub fn record_finalize(decision: &str, success: bool, elapsed: Duration) {
    let labels = [
        ("decision", decision.to_string()),
        ("success", success.to_string()),
    ];
    counter!("recon_finalize_total", &labels).increment(1);
    histogram!("recon_shipment_call_seconds", &labels).record(elapsed.as_secs_f64());
}
