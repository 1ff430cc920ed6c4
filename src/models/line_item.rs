use crate::service::totals::{compute_totals, round2};
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn zero() -> BigDecimal {
    BigDecimal::zero()
}

/// 单据明细行
///
/// `total` 恒等于 `round2(quantity * unit_price)`, 每次修改数量或单价都立即重算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    #[serde(default = "zero")]
    pub total: BigDecimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: BigDecimal, unit_price: BigDecimal) -> Self {
        let mut item = Self {
            id: Uuid::new_v4(),
            description: description.into(),
            quantity,
            unit_price,
            total: BigDecimal::zero(),
        };
        item.recompute();
        item
    }

    pub fn set_quantity(&mut self, quantity: BigDecimal) {
        self.quantity = quantity;
        self.recompute();
    }

    pub fn set_unit_price(&mut self, unit_price: BigDecimal) {
        self.unit_price = unit_price;
        self.recompute();
    }

    /// 按当前数量和单价重算行金额
    pub fn recompute(&mut self) {
        self.total = round2(&(&self.quantity * &self.unit_price));
    }

    /// 数量和单价均非负
    ///
    /// 计算本身不做校验, 负值照常参与运算; 编辑界面可以用这个方法给出提示。
    pub fn is_valid(&self) -> bool {
        self.quantity >= BigDecimal::zero() && self.unit_price >= BigDecimal::zero()
    }
}

/// 单据汇总 (派生数据, 不单独持久化)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: BigDecimal,
    pub labor_cost: BigDecimal,
    /// 税率 (百分比, 0-100)
    pub tax_rate: BigDecimal,
    pub tax_amount: BigDecimal,
    /// 预扣税率 (百分比, 0-100)
    pub withholding_rate: BigDecimal,
    pub withholding_amount: BigDecimal,
    pub total: BigDecimal,
}

impl DocumentTotals {
    pub fn compute(
        items: &[LineItem],
        labor_cost: &BigDecimal,
        tax_rate: &BigDecimal,
        withholding_rate: &BigDecimal,
    ) -> Self {
        compute_totals(items, labor_cost, tax_rate, withholding_rate)
    }
}

/// 汇总计算的输入 (编辑器提交的原始字段)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalsInput {
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default = "zero")]
    pub labor_cost: BigDecimal,
    #[serde(default = "zero")]
    pub tax_rate: BigDecimal,
    #[serde(default = "zero")]
    pub withholding_rate: BigDecimal,
}

impl TotalsInput {
    /// 重算所有明细行后计算汇总
    pub fn evaluate(mut self) -> (Vec<LineItem>, DocumentTotals) {
        for item in &mut self.items {
            item.recompute();
        }
        let totals = compute_totals(&self.items, &self.labor_cost, &self.tax_rate, &self.withholding_rate);
        (self.items, totals)
    }
}
