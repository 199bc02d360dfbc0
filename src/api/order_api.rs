// ==========================================
// 注塑生产管理系统 - 生产订单 API
// ==========================================
// 职责: 建单、指标更新、订单重算、库存输入、开关单、汇总查询
// 红线: 重算的"读取 → 计算 → 写回"在同一事务内完成
// 红线: 汇总查询只读取持久化的派生字段，不重新计算
// ==========================================

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator;
use crate::config::EngineConfig;
use crate::domain::batch::{BaseMassColumn, ColorBatch};
use crate::domain::order::{OrderMetrics, ProductionOrder, TechnicalSnapshot, TechnicalSnapshotPatch};
use crate::domain::recipe::{MaterialLine, PigmentLine};
use crate::domain::status_history::OrderStatusChange;
use crate::domain::types::{MaterialKind, ProductionStrategy};
use crate::engine::{parse_strategy, OrderMetricsEngine, PigmentProvisioner, RecomputeReport};
use crate::repository::{RepositoryError, TxScope, UnitOfWork};

// ==========================================
// 请求 DTO
// ==========================================

/// 建单请求（订单抬头 + 批次 + 配方）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub order_no: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub mold: Option<String>,
    #[serde(default)]
    pub machine_code: Option<String>,

    pub strategy: String, // BY_WEIGHT / BY_QUANTITY / BY_STOCK
    #[serde(default)]
    pub target_mass_kg: Option<f64>,
    #[serde(default)]
    pub target_dozens: Option<f64>,

    // ===== 技术快照 =====
    pub unit_mass_g: f64,
    pub cavities: u32,
    pub shot_mass_g: f64,
    #[serde(default)]
    pub cycle_time_s: Option<f64>,
    #[serde(default)]
    pub shift_hours: Option<f64>, // 缺省取配置 default_shift_hours
    pub start_date: NaiveDateTime,

    #[serde(default)]
    pub product_color_family: Option<String>,
    #[serde(default)]
    pub legacy_color_family: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,

    #[serde(default)]
    pub batches: Vec<BatchInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    pub color_name: String,
    #[serde(default)]
    pub workers: Option<i32>,
    #[serde(default)]
    pub stock_kg: Option<f64>,
    #[serde(default)]
    pub materials: Vec<MaterialInput>,
    #[serde(default)]
    pub pigments: Vec<PigmentInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialInput {
    pub material_name: String,
    pub material_kind: String, // VIRGIN / REGRIND
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PigmentInput {
    pub pigment_name: String,
    pub dose_g: f64,
}

// ==========================================
// 汇总视图 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_no: String,
    pub product_name: Option<String>,
    pub machine_code: Option<String>,
    pub strategy: ProductionStrategy,
    pub active: bool,
    pub snapshot: TechnicalSnapshot,

    pub loss_pct: f64,
    pub extra_pct: f64,
    pub base_mass_kg: f64,
    pub dozens: f64,
    pub total_dozens: f64,
    pub extra_mass_kg: f64,
    pub delivered_mass_kg: f64,
    pub mass_with_loss_kg: f64,
    pub natural_loss_kg: f64,
    pub hours: f64,
    pub days: f64,
    pub finish_date: Option<NaiveDateTime>,
    pub active_batch_count: u32,
    pub color_family: Option<String>,

    pub batches: Vec<BatchSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub seq_no: i32,
    pub color_name: String,
    pub workers: u32,
    pub stock_kg_manual: Option<f64>,
    pub base_mass: Option<BaseMassColumn>,
    pub extra_mass_kg: f64,
    pub total_with_extra_kg: f64,
    pub shots: f64,
    pub labor_hours: f64,
    pub materials: Vec<MaterialSummary>,
    pub pigments: Vec<PigmentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialSummary {
    pub material_name: String,
    pub material_kind: MaterialKind,
    pub fraction: f64,
    pub required_mass_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PigmentSummary {
    pub pigment_name: String,
    pub dose_g: f64,
}

/// 展示用取整
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl OrderSummary {
    /// 由持久化字段组装；百分比保留 4 位，其余保留 2 位
    pub fn from_parts(order: &ProductionOrder, batches: &[ColorBatch]) -> Self {
        let m: &OrderMetrics = &order.metrics;
        Self {
            order_no: order.order_no.clone(),
            product_name: order.product_name.clone(),
            machine_code: order.machine_code.clone(),
            strategy: order.strategy,
            active: order.active,
            snapshot: order.snapshot.clone(),
            loss_pct: round_to(m.loss_pct, 4),
            extra_pct: round_to(m.extra_pct, 4),
            base_mass_kg: round_to(m.base_mass_kg, 2),
            dozens: round_to(m.dozens, 2),
            total_dozens: m.total_dozens,
            extra_mass_kg: round_to(m.extra_mass_kg, 2),
            delivered_mass_kg: round_to(m.delivered_mass_kg, 2),
            mass_with_loss_kg: round_to(m.mass_with_loss_kg, 2),
            natural_loss_kg: round_to(m.natural_loss_kg, 2),
            hours: round_to(m.hours, 2),
            days: round_to(m.days, 2),
            finish_date: m.finish_date,
            active_batch_count: m.active_batch_count,
            color_family: m.color_family.clone(),
            batches: batches.iter().map(BatchSummary::from).collect(),
        }
    }
}

impl From<&ColorBatch> for BatchSummary {
    fn from(b: &ColorBatch) -> Self {
        Self {
            batch_id: b.batch_id.clone(),
            seq_no: b.seq_no,
            color_name: b.color_name.clone(),
            workers: b.workers,
            stock_kg_manual: b.stock_kg_manual,
            base_mass: b.metrics.base_mass,
            extra_mass_kg: round_to(b.metrics.extra_mass_kg, 2),
            total_with_extra_kg: round_to(b.metrics.total_with_extra_kg(), 2),
            shots: round_to(b.metrics.shots, 2),
            labor_hours: round_to(b.metrics.labor_hours, 2),
            materials: b
                .materials
                .iter()
                .map(|l| MaterialSummary {
                    material_name: l.material_name.clone(),
                    material_kind: l.material_kind,
                    fraction: l.fraction,
                    required_mass_kg: round_to(l.required_mass_kg, 2),
                })
                .collect(),
            pigments: b
                .pigments
                .iter()
                .map(|p| PigmentSummary {
                    pigment_name: p.pigment_name.clone(),
                    dose_g: PigmentProvisioner::dose_g(p),
                })
                .collect(),
        }
    }
}

// ==========================================
// OrderApi - 生产订单 API
// ==========================================
pub struct OrderApi {
    uow: Arc<UnitOfWork>,
    config: EngineConfig,
}

impl OrderApi {
    pub fn new(uow: Arc<UnitOfWork>, config: EngineConfig) -> Self {
        Self { uow, config }
    }

    fn engine(&self) -> OrderMetricsEngine {
        OrderMetricsEngine::new(&self.config)
    }

    /// 建单: 订单 + 批次 + 配方一并写入，并在同一事务内完成首次计算
    ///
    /// # 返回
    /// - Ok(OrderSummary): 建单后的汇总
    /// - Err(UnknownStrategy): 策略取值不认识
    /// - Err(BusinessRuleViolation): 订单号已存在
    pub fn create_order(&self, req: CreateOrderRequest) -> ApiResult<OrderSummary> {
        let (mut order, mut batches) = self.build_order(&req)?;
        let engine = self.engine();

        let report = self.uow.execute(|tx| -> ApiResult<RecomputeReport> {
            if tx.orders().find_order(&order.order_no)?.is_some() {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "订单号已存在: {}",
                    order.order_no
                )));
            }

            let report = engine.recompute(&mut order, &mut batches)?;

            tx.orders().insert_order(&order)?;
            for batch in &batches {
                tx.orders().insert_batch(batch)?;
            }
            tx.history().insert(&OrderStatusChange {
                change_id: uuid::Uuid::new_v4().to_string(),
                order_no: order.order_no.clone(),
                previous_active: None,
                new_active: true,
                changed_at: order.created_at,
                changed_by: req.created_by.clone(),
                reason: None,
            })?;
            Ok(report)
        })?;

        tracing::info!(
            order_no = %order.order_no,
            strategy = %order.strategy,
            batch_count = batches.len(),
            warnings = report.warnings.len(),
            "订单已创建"
        );
        Ok(OrderSummary::from_parts(&order, &batches))
    }

    /// 重新计算订单（读取当前策略 / 快照 / 批次，覆写全部派生字段）
    pub fn recompute_order(&self, order_no: &str) -> ApiResult<RecomputeReport> {
        validator::require_text("订单号", order_no)?;
        let engine = self.engine();
        let report = self
            .uow
            .execute(|tx| recompute_in_tx(tx, &engine, order_no, None))?;
        tracing::info!(order_no, batch_count = report.batch_count, "订单已重算");
        Ok(report)
    }

    /// 更新技术快照（唯一允许修改快照的路径），随后整体重算
    pub fn update_metrics(
        &self,
        order_no: &str,
        patch: TechnicalSnapshotPatch,
    ) -> ApiResult<RecomputeReport> {
        validator::require_text("订单号", order_no)?;
        validator::validate_snapshot_patch(&patch)?;
        let engine = self.engine();

        let report = self
            .uow
            .execute(|tx| recompute_in_tx(tx, &engine, order_no, Some(&patch)))?;
        tracing::info!(order_no, ?patch, "订单技术快照已更新");
        Ok(report)
    }

    /// 修改批次手工库存输入（BY_STOCK 合计依赖它，需重算订单）
    pub fn set_batch_stock(&self, batch_id: &str, stock_kg: Option<f64>) -> ApiResult<RecomputeReport> {
        validator::require_text("批次ID", batch_id)?;
        validator::require_non_negative_opt("库存重量", stock_kg)?;
        let engine = self.engine();

        self.uow.execute(|tx| -> ApiResult<RecomputeReport> {
            let order_no = tx
                .orders()
                .find_batch_order_no(batch_id)?
                .ok_or_else(|| RepositoryError::not_found("ColorBatch", batch_id))?;
            tx.orders().set_batch_stock(batch_id, stock_kg)?;
            recompute_in_tx(tx, &engine, &order_no, None)
        })
    }

    /// 开单 / 关单
    ///
    /// # 返回
    /// - Ok(Some(change)): 状态发生变化，已记录历史
    /// - Ok(None): 状态未变化，不记录
    pub fn set_order_status(
        &self,
        order_no: &str,
        open: bool,
        user: Option<&str>,
        reason: Option<&str>,
    ) -> ApiResult<Option<OrderStatusChange>> {
        validator::require_text("订单号", order_no)?;

        let change = self.uow.execute(|tx| -> ApiResult<Option<OrderStatusChange>> {
            let order = tx
                .orders()
                .find_order(order_no)?
                .ok_or_else(|| RepositoryError::not_found("ProductionOrder", order_no))?;

            if order.active == open {
                return Ok(None);
            }

            tx.orders().set_active(order_no, open)?;
            let change = OrderStatusChange {
                change_id: uuid::Uuid::new_v4().to_string(),
                order_no: order_no.to_string(),
                previous_active: Some(order.active),
                new_active: open,
                changed_at: chrono::Local::now().naive_local(),
                changed_by: user.map(str::to_string),
                reason: reason.map(str::to_string),
            };
            tx.history().insert(&change)?;
            Ok(Some(change))
        })?;

        if let Some(c) = &change {
            tracing::info!(order_no, action = ?c.action(), user = ?user, "订单状态已变更");
        }
        Ok(change)
    }

    /// 订单状态变更历史
    pub fn list_status_history(&self, order_no: &str) -> ApiResult<Vec<OrderStatusChange>> {
        validator::require_text("订单号", order_no)?;
        self.uow
            .read(|tx| tx.history().list_by_order(order_no).map_err(ApiError::from))
    }

    /// 订单汇总（只读持久化字段）
    pub fn get_summary(&self, order_no: &str) -> ApiResult<OrderSummary> {
        validator::require_text("订单号", order_no)?;
        self.uow.read(|tx| -> ApiResult<OrderSummary> {
            let order = tx
                .orders()
                .find_order(order_no)?
                .ok_or_else(|| RepositoryError::not_found("ProductionOrder", order_no))?;
            let batches = tx.orders().list_batches(order_no)?;
            Ok(OrderSummary::from_parts(&order, &batches))
        })
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn build_order(&self, req: &CreateOrderRequest) -> ApiResult<(ProductionOrder, Vec<ColorBatch>)> {
        validator::require_text("订单号", &req.order_no)?;
        let strategy = parse_strategy(&req.strategy)?;

        match strategy {
            ProductionStrategy::ByWeight if req.target_mass_kg.is_none() => {
                return Err(ApiError::InvalidInput(
                    "BY_WEIGHT 策略需要目标重量 target_mass_kg".to_string(),
                ));
            }
            ProductionStrategy::ByQuantity if req.target_dozens.is_none() => {
                return Err(ApiError::InvalidInput(
                    "BY_QUANTITY 策略需要目标打数 target_dozens".to_string(),
                ));
            }
            _ => {}
        }

        validator::require_non_negative_opt("目标重量", req.target_mass_kg)?;
        validator::require_non_negative_opt("目标打数", req.target_dozens)?;
        validator::require_non_negative("单件重量", req.unit_mass_g)?;
        validator::require_cavities(req.cavities)?;
        validator::require_non_negative("单模总重", req.shot_mass_g)?;
        validator::require_non_negative_opt("成型周期", req.cycle_time_s)?;
        validator::require_non_negative_opt("班次时长", req.shift_hours)?;

        let order_no = req.order_no.trim().to_string();
        let order = ProductionOrder {
            order_no: order_no.clone(),
            product_name: req.product_name.clone(),
            mold: req.mold.clone(),
            machine_code: req.machine_code.clone(),
            created_at: chrono::Local::now().naive_local(),
            strategy,
            target_mass_kg: req.target_mass_kg,
            target_dozens: req.target_dozens,
            snapshot: TechnicalSnapshot {
                unit_mass_g: req.unit_mass_g,
                cavities: req.cavities,
                shot_mass_g: req.shot_mass_g,
                cycle_time_s: req.cycle_time_s.unwrap_or(0.0),
                shift_hours: req.shift_hours.unwrap_or(self.config.default_shift_hours),
                start_date: req.start_date,
            },
            product_color_family: req.product_color_family.clone(),
            legacy_color_family: req.legacy_color_family.clone(),
            active: true,
            metrics: OrderMetrics::default(),
        };

        let mut batches = Vec::with_capacity(req.batches.len());
        for (i, input) in req.batches.iter().enumerate() {
            let seq_no = i as i32 + 1;
            validator::require_text("颜色", &input.color_name)?;
            validator::require_non_negative_opt("库存重量", input.stock_kg)?;
            let workers = validator::resolve_workers("人数", input.workers)?;

            let mut batch = ColorBatch::new(&order_no, seq_no, input.color_name.trim(), workers);
            batch.stock_kg_manual = input.stock_kg;

            for (j, m) in input.materials.iter().enumerate() {
                validator::require_text("原料名称", &m.material_name)?;
                validator::require_fraction("原料配比", m.fraction)?;
                let kind = m
                    .material_kind
                    .parse::<MaterialKind>()
                    .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
                batch.materials.push(MaterialLine::new(
                    &batch.batch_id,
                    j as i32 + 1,
                    &m.material_name,
                    kind,
                    m.fraction,
                ));
            }

            for (j, p) in input.pigments.iter().enumerate() {
                validator::require_text("色粉名称", &p.pigment_name)?;
                validator::require_non_negative("色粉剂量", p.dose_g)?;
                batch.pigments.push(PigmentLine::new(
                    &batch.batch_id,
                    j as i32 + 1,
                    &p.pigment_name,
                    p.dose_g,
                ));
            }

            batches.push(batch);
        }

        Ok((order, batches))
    }
}

/// 事务内重算: 读取订单与批次 → (可选) 应用快照补丁 → 计算 → 写回
fn recompute_in_tx(
    tx: &TxScope<'_>,
    engine: &OrderMetricsEngine,
    order_no: &str,
    patch: Option<&TechnicalSnapshotPatch>,
) -> ApiResult<RecomputeReport> {
    let orders = tx.orders();
    let mut order = orders
        .find_order(order_no)?
        .ok_or_else(|| RepositoryError::not_found("ProductionOrder", order_no))?;

    if let Some(p) = patch {
        order.snapshot.apply(p);
        orders.update_snapshot(order_no, &order.snapshot)?;
    }

    let mut batches = orders.list_batches(order_no)?;
    let report = engine.recompute(&mut order, &mut batches)?;

    orders.update_metrics(order_no, &order.metrics)?;
    for batch in &batches {
        orders.update_batch_metrics(batch)?;
    }
    Ok(report)
}
