// ==========================================
// 注塑生产管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 所有 API 共享同一个数据库连接（Arc<Mutex<Connection>>）
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{OrderApi, RegisterApi};
use crate::config::{ConfigManager, EngineConfig};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::UnitOfWork;

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的引擎配置
    pub engine_config: EngineConfig,

    /// 配置管理器（读写 config_kv）
    pub config_manager: Arc<ConfigManager>,

    /// 订单API
    pub order_api: Arc<OrderApi>,

    /// 班次登记API
    pub register_api: Arc<RegisterApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 1. 打开共享连接并建表（幂等）
    /// 2. 读取引擎配置
    /// 3. 创建所有API实例
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let engine_config = EngineConfig::load(config_manager.as_ref())
            .await
            .map_err(|e| format!("无法加载引擎配置: {}", e))?;

        // ==========================================
        // API层
        // ==========================================
        let uow = Arc::new(UnitOfWork::from_connection(conn));
        let order_api = Arc::new(OrderApi::new(uow.clone(), engine_config.clone()));
        let register_api = Arc::new(RegisterApi::new(
            uow,
            engine_config.weight_match_tolerance_kg,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            engine_config,
            config_manager,
            order_api,
            register_api,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 INJECTION_PRODUCTION_DB_PATH（若设置）
/// - 开发环境: 用户数据目录/injection-production-dev/injection_production.db
/// - 生产环境: 用户数据目录/injection-production/injection_production.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("INJECTION_PRODUCTION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./injection_production.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("injection-production-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("injection-production");
        }

        // 目录创建失败时由打开数据库报错
        std::fs::create_dir_all(&path).ok();
        path = path.join("injection_production.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[tokio::test]
    async fn test_app_state_bootstraps_empty_database() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let db_path = file.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path).await.unwrap();
        assert_eq!(state.engine_config, EngineConfig::default());
    }
}
