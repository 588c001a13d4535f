//! 数据库表结构
//!
//! 计划行的 CHECK 约束是数量台账的最后防线

use recon_adapter_postgres::Migration;

const V1_INITIAL: &str = r#"
CREATE TABLE IF NOT EXISTS purchase_orders (
    po_number   VARCHAR(64) PRIMARY KEY,
    supplier    VARCHAR(255) NOT NULL,
    status      VARCHAR(32) NOT NULL DEFAULT 'OPEN',
    notes       TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS skus (
    sku_code    VARCHAR(64) PRIMARY KEY,
    description VARCHAR(255) NOT NULL,
    color       VARCHAR(64),
    category    VARCHAR(64),
    size        VARCHAR(32)
);

CREATE TABLE IF NOT EXISTS upc_mappings (
    upc         VARCHAR(64) PRIMARY KEY,
    sku_code    VARCHAR(64) NOT NULL REFERENCES skus (sku_code)
);

CREATE TABLE IF NOT EXISTS catalog_records (
    id          BIGSERIAL PRIMARY KEY,
    qr_token    VARCHAR(512) NOT NULL,
    upc         VARCHAR(64) NOT NULL,
    source      VARCHAR(64),
    metadata    JSONB NOT NULL DEFAULT 'null'::jsonb,
    synced_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_catalog_records_token
    ON catalog_records (qr_token, synced_at DESC, id DESC);

CREATE TABLE IF NOT EXISTS cartons (
    carton_id       VARCHAR(64) PRIMARY KEY,
    po_number       VARCHAR(64) NOT NULL REFERENCES purchase_orders (po_number),
    total_expected  INTEGER NOT NULL CHECK (total_expected >= 0),
    status          VARCHAR(16) NOT NULL DEFAULT 'PENDING'
        CHECK (status IN ('PENDING', 'IN_PROGRESS', 'COMPLETED', 'CANCELED')),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS carton_sku_plans (
    carton_id   VARCHAR(64) NOT NULL REFERENCES cartons (carton_id) ON DELETE CASCADE,
    sku_code    VARCHAR(64) NOT NULL REFERENCES skus (sku_code),
    expected    INTEGER NOT NULL CHECK (expected > 0),
    scanned     INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (carton_id, sku_code),
    CONSTRAINT carton_sku_plans_scanned_range CHECK (scanned >= 0 AND scanned <= expected)
);

CREATE TABLE IF NOT EXISTS boxes (
    box_id          UUID PRIMARY KEY,
    box_code        VARCHAR(255) NOT NULL,
    box_date        DATE NOT NULL,
    sku_code        VARCHAR(64) NOT NULL REFERENCES skus (sku_code),
    expected_units  INTEGER NOT NULL CHECK (expected_units > 0),
    sequence        INTEGER NOT NULL,
    carton_id       VARCHAR(64) REFERENCES cartons (carton_id) ON DELETE SET NULL,
    validated       BOOLEAN NOT NULL DEFAULT FALSE,
    status          VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT boxes_box_code_key UNIQUE (box_code)
);

CREATE TABLE IF NOT EXISTS scans (
    scan_id         UUID PRIMARY KEY,
    carton_id       VARCHAR(64) NOT NULL REFERENCES cartons (carton_id) ON DELETE CASCADE,
    sku_code        VARCHAR(64) NOT NULL,
    qr_token        VARCHAR(512) NOT NULL,
    upc             VARCHAR(64) NOT NULL,
    status          VARCHAR(16) NOT NULL,
    operator        VARCHAR(128) NOT NULL,
    device          VARCHAR(128) NOT NULL,
    source_box_id   UUID REFERENCES boxes (box_id) ON DELETE SET NULL,
    scanned_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT scans_carton_qr_key UNIQUE (carton_id, qr_token)
);

CREATE INDEX IF NOT EXISTS idx_scans_carton ON scans (carton_id, scanned_at);

CREATE TABLE IF NOT EXISTS box_scans (
    box_scan_id     UUID PRIMARY KEY,
    box_id          UUID NOT NULL REFERENCES boxes (box_id) ON DELETE CASCADE,
    qr_token        VARCHAR(512) NOT NULL,
    upc             VARCHAR(64) NOT NULL,
    sku_code        VARCHAR(64) NOT NULL,
    status          VARCHAR(16) NOT NULL,
    operator        VARCHAR(128) NOT NULL,
    device          VARCHAR(128) NOT NULL,
    scanned_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT box_scans_box_qr_key UNIQUE (box_id, qr_token)
);

CREATE INDEX IF NOT EXISTS idx_box_scans_box ON box_scans (box_id, scanned_at);
"#;

/// 按版本升序的全部迁移
pub fn migrations() -> Vec<Migration> {
    vec![Migration::new(1, "initial_schema", V1_INITIAL)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_ascending() {
        let migrations = migrations();
        assert!(
            migrations
                .windows(2)
                .all(|w| w[0].version < w[1].version)
        );
    }

    #[test]
    fn test_unique_constraints_match_conflict_mapping() {
        for name in ["scans_carton_qr_key", "box_scans_box_qr_key", "boxes_box_code_key"] {
            assert!(V1_INITIAL.contains(name), "{name}");
        }
    }

    #[test]
    fn test_box_sku_references_master_data() {
        let boxes = V1_INITIAL
            .split("CREATE TABLE")
            .find(|t| t.contains("IF NOT EXISTS boxes "))
            .unwrap();
        assert!(boxes.contains("sku_code        VARCHAR(64) NOT NULL REFERENCES skus (sku_code)"));
    }
}
