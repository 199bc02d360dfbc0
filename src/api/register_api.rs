// ==========================================
// 注塑生产管理系统 - 班次生产登记 API
// ==========================================
// 职责: 登记创建、计数器修改、小时明细、实测称重、称重校验、称重同步、批量重算
// 红线: 每次变更后在同一事务内重算登记合计
// 红线: 订单关闭后不允许新增 / 修改登记
// ==========================================

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator;
use crate::domain::order::ProductionOrder;
use crate::domain::register::{DailyRegister, HourlyDetail, RegisterSnapshot, RegisterTotals, WeighIn};
use crate::engine::{DailyRegisterReconciler, LiveOrderValues, WeightValidation};
use crate::repository::{RepositoryError, TxScope, UnitOfWork};

/// 批量重算时视为"发生变化"的重量阈值 (kg)
pub const RECALC_CHANGE_THRESHOLD_KG: f64 = 0.001;

// ==========================================
// 请求 / 响应 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRegisterRequest {
    pub order_no: String,
    #[serde(default)]
    pub machine_code: Option<String>, // 缺省取订单机台
    pub production_date: NaiveDate,
    pub shift: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub start_counter: i64,
    #[serde(default)]
    pub end_counter: i64,
    #[serde(default)]
    pub hourly_details: Vec<HourlyDetailInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyDetailInput {
    pub hour_label: String,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub shots: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeighInInput {
    pub mass_kg: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub weighed_at: Option<NaiveDateTime>, // 缺省为当前时间
}

/// 称重站离线上传的一条记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncWeighInItem {
    pub local_id: String,
    pub order_no: String,
    pub machine_code: String,
    pub production_date: NaiveDate,
    pub shift: String,
    pub mass_kg: f64,
    #[serde(default)]
    pub color: Option<String>,
    pub weighed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncItemResult {
    pub local_id: String,
    pub success: bool,
    pub register_id: Option<String>,
    pub weigh_in_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub results: Vec<SyncItemResult>,
}

/// 批量重算中重量发生变化的登记
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterMassChange {
    pub register_id: String,
    pub old_mass_kg: f64,
    pub new_mass_kg: f64,
    pub total_shots: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterView {
    pub register: DailyRegister,
    pub hourly_details: Vec<HourlyDetail>,
    pub weigh_ins: Vec<WeighIn>,
}

// ==========================================
// RegisterApi - 班次登记 API
// ==========================================
pub struct RegisterApi {
    uow: Arc<UnitOfWork>,
    reconciler: DailyRegisterReconciler,
}

impl RegisterApi {
    pub fn new(uow: Arc<UnitOfWork>, weight_match_tolerance_kg: f64) -> Self {
        Self {
            uow,
            reconciler: DailyRegisterReconciler::new(weight_match_tolerance_kg),
        }
    }

    /// 创建班次登记（快照在此刻从订单复制）
    pub fn create_register(&self, req: CreateRegisterRequest) -> ApiResult<RegisterView> {
        validator::require_text("订单号", &req.order_no)?;
        validator::require_text("班次", &req.shift)?;
        validator::require_counters(req.start_counter, req.end_counter)?;
        for d in &req.hourly_details {
            validator::require_text("时段", &d.hour_label)?;
            validator::require_shots(d.shots)?;
        }

        let view = self.uow.execute(|tx| -> ApiResult<RegisterView> {
            let order = require_open_order(tx, &req.order_no)?;
            let machine_code = req
                .machine_code
                .clone()
                .or_else(|| order.machine_code.clone())
                .filter(|m| !m.trim().is_empty())
                .ok_or_else(|| ApiError::InvalidInput("机台不能为空".to_string()))?;

            let register = new_register(
                &order,
                &machine_code,
                req.production_date,
                &req.shift,
                req.start_time.clone(),
                req.operator.clone(),
                req.start_counter,
                req.end_counter,
            );
            tx.registers().insert_register(&register)?;

            for (i, input) in req.hourly_details.iter().enumerate() {
                let detail = new_detail(&register, i as i32 + 1, input);
                tx.registers().insert_hourly_detail(&detail)?;
            }

            self.recompute_in_tx(tx, &register.register_id)?;
            load_view(tx, &register.register_id)
        })?;

        tracing::info!(
            register_id = %view.register.register_id,
            order_no = %view.register.order_no,
            shift = %view.register.shift,
            "班次登记已创建"
        );
        Ok(view)
    }

    /// 查询登记（含明细与称重）
    pub fn get_register(&self, register_id: &str) -> ApiResult<RegisterView> {
        validator::require_text("登记ID", register_id)?;
        self.uow.read(|tx| load_view(tx, register_id))
    }

    /// 修改计数器
    pub fn edit_counters(
        &self,
        register_id: &str,
        start_counter: i64,
        end_counter: i64,
    ) -> ApiResult<RegisterTotals> {
        validator::require_counters(start_counter, end_counter)?;
        self.uow.execute(|tx| -> ApiResult<RegisterTotals> {
            let register = require_register(tx, register_id)?;
            require_open_order(tx, &register.order_no)?;
            tx.registers()
                .update_counters(register_id, start_counter, end_counter)?;
            self.recompute_in_tx(tx, register_id)
        })
    }

    /// 新增小时明细
    pub fn add_hourly_detail(
        &self,
        register_id: &str,
        input: HourlyDetailInput,
    ) -> ApiResult<HourlyDetail> {
        validator::require_text("时段", &input.hour_label)?;
        validator::require_shots(input.shots)?;
        self.uow.execute(|tx| -> ApiResult<HourlyDetail> {
            let register = require_register(tx, register_id)?;
            require_open_order(tx, &register.order_no)?;
            let seq_no = tx.registers().next_hourly_seq(register_id)?;
            let detail = new_detail(&register, seq_no, &input);
            tx.registers().insert_hourly_detail(&detail)?;
            self.recompute_in_tx(tx, register_id)?;
            Ok(detail)
        })
    }

    /// 删除小时明细
    pub fn remove_hourly_detail(&self, detail_id: &str) -> ApiResult<RegisterTotals> {
        validator::require_text("明细ID", detail_id)?;
        self.uow.execute(|tx| -> ApiResult<RegisterTotals> {
            let register_id = tx
                .registers()
                .find_hourly_detail_register_id(detail_id)?
                .ok_or_else(|| RepositoryError::not_found("HourlyDetail", detail_id))?;
            let register = require_register(tx, &register_id)?;
            require_open_order(tx, &register.order_no)?;
            tx.registers().delete_hourly_detail(detail_id)?;
            self.recompute_in_tx(tx, &register_id)
        })
    }

    /// 新增实测称重
    pub fn add_weigh_in(&self, register_id: &str, input: WeighInInput) -> ApiResult<WeighIn> {
        validator::require_non_negative("称重重量", input.mass_kg)?;
        let weigh_in = self.uow.execute(|tx| -> ApiResult<WeighIn> {
            let register = require_register(tx, register_id)?;
            require_open_order(tx, &register.order_no)?;
            let weigh_in = WeighIn {
                weigh_in_id: uuid::Uuid::new_v4().to_string(),
                register_id: register_id.to_string(),
                mass_kg: input.mass_kg,
                color: input.color.clone(),
                weighed_at: input
                    .weighed_at
                    .unwrap_or_else(|| chrono::Local::now().naive_local()),
            };
            tx.registers().insert_weigh_in(&weigh_in)?;
            self.recompute_in_tx(tx, register_id)?;
            Ok(weigh_in)
        })?;
        tracing::debug!(register_id, mass_kg = weigh_in.mass_kg, "称重已记录");
        Ok(weigh_in)
    }

    /// 删除实测称重
    pub fn remove_weigh_in(&self, weigh_in_id: &str) -> ApiResult<RegisterTotals> {
        validator::require_text("称重ID", weigh_in_id)?;
        self.uow.execute(|tx| -> ApiResult<RegisterTotals> {
            let register_id = tx
                .registers()
                .find_weigh_in_register_id(weigh_in_id)?
                .ok_or_else(|| RepositoryError::not_found("WeighIn", weigh_in_id))?;
            let register = require_register(tx, &register_id)?;
            require_open_order(tx, &register.order_no)?;
            tx.registers().delete_weigh_in(weigh_in_id)?;
            self.recompute_in_tx(tx, &register_id)
        })
    }

    /// 重新计算登记合计（维护操作，不检查订单状态）
    pub fn recompute_register(&self, register_id: &str) -> ApiResult<RegisterTotals> {
        validator::require_text("登记ID", register_id)?;
        let totals = self
            .uow
            .execute(|tx| self.recompute_in_tx(tx, register_id))?;
        tracing::info!(
            register_id,
            output_mass_kg = totals.output_mass_kg,
            mass_source = %totals.mass_source,
            "登记合计已重算"
        );
        Ok(totals)
    }

    /// 称重校验: 实测合计 vs 理论合计
    pub fn validate_weight(&self, register_id: &str) -> ApiResult<WeightValidation> {
        validator::require_text("登记ID", register_id)?;
        self.uow.read(|tx| -> ApiResult<WeightValidation> {
            let register = require_register(tx, register_id)?;
            let details = tx.registers().list_hourly_details(register_id)?;
            let weigh_ins = tx.registers().list_weigh_ins(register_id)?;
            let live = live_values(tx, &register.order_no)?;
            Ok(self
                .reconciler
                .validate_weight(&register, &details, &weigh_ins, live))
        })
    }

    /// 称重站同步: 每条记录独立事务，单条失败不影响其他记录
    pub fn sync_weigh_ins(&self, items: Vec<SyncWeighInItem>) -> ApiResult<SyncReport> {
        let mut report = SyncReport::default();

        for item in items {
            match self.sync_one(&item) {
                Ok((register_id, weigh_in_id)) => {
                    report.synced += 1;
                    report.results.push(SyncItemResult {
                        local_id: item.local_id,
                        success: true,
                        register_id: Some(register_id),
                        weigh_in_id: Some(weigh_in_id),
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(local_id = %item.local_id, error = %e, "称重同步失败");
                    report.failed += 1;
                    report.results.push(SyncItemResult {
                        local_id: item.local_id,
                        success: false,
                        register_id: None,
                        weigh_in_id: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        tracing::info!(synced = report.synced, failed = report.failed, "称重同步完成");
        Ok(report)
    }

    /// 批量重算全部登记，返回产出重量变化超过阈值的登记
    pub fn recalc_all_registers(&self) -> ApiResult<Vec<RegisterMassChange>> {
        let changes = self.uow.execute(|tx| -> ApiResult<Vec<RegisterMassChange>> {
            let mut changes = Vec::new();
            for register_id in tx.registers().list_register_ids()? {
                let register = require_register(tx, &register_id)?;
                let old_mass_kg = register.totals.output_mass_kg;
                let totals = self.recompute_in_tx(tx, &register_id)?;
                if (totals.output_mass_kg - old_mass_kg).abs() > RECALC_CHANGE_THRESHOLD_KG {
                    changes.push(RegisterMassChange {
                        register_id,
                        old_mass_kg,
                        new_mass_kg: totals.output_mass_kg,
                        total_shots: totals.total_shots,
                    });
                }
            }
            Ok(changes)
        })?;

        tracing::info!(changed = changes.len(), "登记批量重算完成");
        Ok(changes)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn sync_one(&self, item: &SyncWeighInItem) -> ApiResult<(String, String)> {
        validator::require_text("local_id", &item.local_id)?;
        validator::require_text("订单号", &item.order_no)?;
        validator::require_text("机台", &item.machine_code)?;
        validator::require_text("班次", &item.shift)?;
        validator::require_non_negative("称重重量", item.mass_kg)?;

        // 查找与新建使用同一规范化键
        let machine_code = normalize_machine_code(&item.machine_code);
        let shift = item.shift.trim();

        self.uow.execute(|tx| -> ApiResult<(String, String)> {
            let order = require_open_order(tx, &item.order_no)?;

            let register = match tx.registers().find_register_by_shift(
                &item.order_no,
                &machine_code,
                item.production_date,
                shift,
            )? {
                Some(r) => r,
                None => {
                    let r = new_register(
                        &order,
                        &machine_code,
                        item.production_date,
                        shift,
                        Some("00:00".to_string()),
                        None,
                        0,
                        0,
                    );
                    tx.registers().insert_register(&r)?;
                    tracing::info!(
                        register_id = %r.register_id,
                        order_no = %r.order_no,
                        "同步时自动创建班次登记"
                    );
                    r
                }
            };

            let weigh_in = WeighIn {
                weigh_in_id: uuid::Uuid::new_v4().to_string(),
                register_id: register.register_id.clone(),
                mass_kg: item.mass_kg,
                color: item.color.clone(),
                weighed_at: item.weighed_at,
            };
            tx.registers().insert_weigh_in(&weigh_in)?;
            self.recompute_in_tx(tx, &register.register_id)?;
            Ok((register.register_id, weigh_in.weigh_in_id))
        })
    }

    /// 事务内重算登记合计并写回
    fn recompute_in_tx(&self, tx: &TxScope<'_>, register_id: &str) -> ApiResult<RegisterTotals> {
        let registers = tx.registers();
        let register = require_register(tx, register_id)?;
        let details = registers.list_hourly_details(register_id)?;
        let weigh_ins = registers.list_weigh_ins(register_id)?;
        let live = live_values(tx, &register.order_no)?;

        let totals = self
            .reconciler
            .reconcile(&register, &details, &weigh_ins, live);
        registers.update_totals(register_id, &totals)?;
        Ok(totals)
    }
}

// ==========================================
// 事务内辅助函数
// ==========================================

fn require_register(tx: &TxScope<'_>, register_id: &str) -> ApiResult<DailyRegister> {
    tx.registers()
        .find_register(register_id)?
        .ok_or_else(|| RepositoryError::not_found("DailyRegister", register_id).into())
}

fn require_open_order(tx: &TxScope<'_>, order_no: &str) -> ApiResult<ProductionOrder> {
    let order = tx
        .orders()
        .find_order(order_no)?
        .ok_or_else(|| RepositoryError::not_found("ProductionOrder", order_no))?;
    if !order.active {
        return Err(ApiError::OrderClosed(order_no.to_string()));
    }
    Ok(order)
}

fn live_values(tx: &TxScope<'_>, order_no: &str) -> ApiResult<Option<LiveOrderValues>> {
    let order = tx.orders().find_order(order_no)?;
    Ok(order.map(|o| LiveOrderValues {
        shot_mass_g: o.snapshot.shot_mass_g,
        cavities: o.snapshot.cavities,
    }))
}

fn load_view(tx: &TxScope<'_>, register_id: &str) -> ApiResult<RegisterView> {
    let register = require_register(tx, register_id)?;
    Ok(RegisterView {
        hourly_details: tx.registers().list_hourly_details(register_id)?,
        weigh_ins: tx.registers().list_weigh_ins(register_id)?,
        register,
    })
}

/// 机台编码: 去空白并转大写
fn normalize_machine_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[allow(clippy::too_many_arguments)]
fn new_register(
    order: &ProductionOrder,
    machine_code: &str,
    production_date: NaiveDate,
    shift: &str,
    start_time: Option<String>,
    operator: Option<String>,
    start_counter: i64,
    end_counter: i64,
) -> DailyRegister {
    DailyRegister {
        register_id: uuid::Uuid::new_v4().to_string(),
        order_no: order.order_no.clone(),
        machine_code: normalize_machine_code(machine_code),
        production_date,
        shift: shift.trim().to_string(),
        start_time,
        operator,
        start_counter,
        end_counter,
        snapshot: RegisterSnapshot {
            cavities: order.snapshot.cavities,
            unit_mass_g: order.snapshot.unit_mass_g,
            runner_mass_g: order.snapshot.runner_mass_g(),
        },
        totals: RegisterTotals::default(),
        created_at: chrono::Local::now().naive_local(),
    }
}

fn new_detail(register: &DailyRegister, seq_no: i32, input: &HourlyDetailInput) -> HourlyDetail {
    let (pieces, mass_kg) = DailyRegisterReconciler::detail_values(&register.snapshot, input.shots);
    HourlyDetail {
        detail_id: uuid::Uuid::new_v4().to_string(),
        register_id: register.register_id.clone(),
        seq_no,
        hour_label: input.hour_label.trim().to_string(),
        operator: input.operator.clone(),
        color: input.color.clone(),
        shots: input.shots,
        pieces,
        mass_kg,
    }
}
