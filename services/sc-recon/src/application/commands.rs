//! 命令定义

use serde::{Deserialize, Serialize};

use crate::domain::enums::FinalizeDecision;
use crate::domain::value_objects::{BoxId, CartonId, PoNumber, QrToken, ScanContext, SkuCode, Upc};
use crate::error::ScanError;

/// 箱子的定位方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxRef {
    Id(BoxId),
    Code(String),
}

impl BoxRef {
    pub fn describe(&self) -> String {
        match self {
            BoxRef::Id(id) => id.to_string(),
            BoxRef::Code(code) => code.clone(),
        }
    }
}

/// 扫描一件商品进装箱
#[derive(Debug, Clone)]
pub struct AdmitScanCommand {
    pub carton_id: CartonId,
    pub qr_token: QrToken,
    pub context: ScanContext,
}

impl AdmitScanCommand {
    pub fn new(carton_id: impl Into<CartonId>, qr_token: impl Into<QrToken>) -> Self {
        Self {
            carton_id: carton_id.into(),
            qr_token: qr_token.into(),
            context: ScanContext::system(),
        }
    }

    pub fn with_context(mut self, context: ScanContext) -> Self {
        self.context = context;
        self
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.carton_id.is_empty() {
            return Err(ScanError::validation("装箱号不能为空"));
        }
        if self.qr_token.is_empty() {
            return Err(ScanError::validation("二维码不能为空"));
        }
        Ok(())
    }
}

/// 扫描一件商品进箱子
#[derive(Debug, Clone)]
pub struct AdmitBoxScanCommand {
    pub target: BoxRef,
    pub qr_token: QrToken,
    /// 标签上读到的 UPC，提供时必须与目录一致
    pub upc: Option<Upc>,
    pub context: ScanContext,
}

impl AdmitBoxScanCommand {
    pub fn new(target: BoxRef, qr_token: impl Into<QrToken>) -> Self {
        Self {
            target,
            qr_token: qr_token.into(),
            upc: None,
            context: ScanContext::system(),
        }
    }

    pub fn with_upc(mut self, upc: impl Into<Upc>) -> Self {
        self.upc = Some(upc.into());
        self
    }

    pub fn with_context(mut self, context: ScanContext) -> Self {
        self.context = context;
        self
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if let BoxRef::Code(code) = &self.target {
            if code.trim().is_empty() {
                return Err(ScanError::validation("箱码不能为空"));
            }
        }
        if self.qr_token.is_empty() {
            return Err(ScanError::validation("二维码不能为空"));
        }
        if self.upc.as_ref().is_some_and(|u| u.is_empty()) {
            return Err(ScanError::validation("UPC 不能为空字符串"));
        }
        Ok(())
    }
}

/// 把已校验箱子的扫描复用到装箱
#[derive(Debug, Clone)]
pub struct ReuseValidationCommand {
    pub source_box: BoxId,
    pub target_carton: CartonId,
    pub context: ScanContext,
}

impl ReuseValidationCommand {
    pub fn new(source_box: BoxId, target_carton: impl Into<CartonId>) -> Self {
        Self {
            source_box,
            target_carton: target_carton.into(),
            context: ScanContext::system(),
        }
    }

    pub fn with_context(mut self, context: ScanContext) -> Self {
        self.context = context;
        self
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.target_carton.is_empty() {
            return Err(ScanError::validation("目标装箱号不能为空"));
        }
        Ok(())
    }
}

/// 计划行输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLineInput {
    pub sku: SkuCode,
    pub quantity: u32,
}

impl PlanLineInput {
    pub fn new(sku: impl Into<SkuCode>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }
}

/// 创建装箱
#[derive(Debug, Clone)]
pub struct CreateCartonCommand {
    pub carton_id: CartonId,
    pub po_number: PoNumber,
    pub lines: Vec<PlanLineInput>,
}

impl CreateCartonCommand {
    pub fn new(
        carton_id: impl Into<CartonId>,
        po_number: impl Into<PoNumber>,
        lines: Vec<PlanLineInput>,
    ) -> Self {
        Self {
            carton_id: carton_id.into(),
            po_number: po_number.into(),
            lines,
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.carton_id.is_empty() {
            return Err(ScanError::validation("装箱号不能为空"));
        }
        if self.po_number.is_empty() {
            return Err(ScanError::validation("采购单号不能为空"));
        }
        if self.lines.is_empty() {
            return Err(ScanError::validation("计划行不能为空"));
        }
        let mut seen = std::collections::HashSet::new();
        for line in &self.lines {
            if line.sku.is_empty() {
                return Err(ScanError::validation("SKU 不能为空"));
            }
            if line.quantity == 0 {
                return Err(ScanError::validation(format!(
                    "SKU {} 的数量必须大于 0",
                    line.sku
                )));
            }
            if !seen.insert(&line.sku) {
                return Err(ScanError::validation(format!("SKU {} 重复", line.sku)));
            }
        }
        Ok(())
    }

    pub fn total_expected(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// 登记箱子
#[derive(Debug, Clone)]
pub struct RegisterBoxCommand {
    pub code: String,
    pub carton_id: Option<CartonId>,
}

impl RegisterBoxCommand {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            carton_id: None,
        }
    }

    pub fn for_carton(mut self, carton_id: impl Into<CartonId>) -> Self {
        self.carton_id = Some(carton_id.into());
        self
    }
}

/// 结箱
#[derive(Debug, Clone)]
pub struct FinalizeCartonCommand {
    pub carton_id: CartonId,
    pub decision: FinalizeDecision,
}

impl FinalizeCartonCommand {
    pub fn confirm(carton_id: impl Into<CartonId>) -> Self {
        Self {
            carton_id: carton_id.into(),
            decision: FinalizeDecision::Confirm,
        }
    }

    pub fn cancel(carton_id: impl Into<CartonId>) -> Self {
        Self {
            carton_id: carton_id.into(),
            decision: FinalizeDecision::Cancel,
        }
    }
}
