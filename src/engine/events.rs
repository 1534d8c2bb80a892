// ==========================================
// 餐厅运营平台 - 库存事件发布
// ==========================================
// 职责: 定义库存事件发布 trait，供下游（补货提醒、看板）订阅
// 说明: 事件只在事务提交后发布；发布失败只记日志，不影响已提交的扣减
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 库存事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEventType {
    /// 订单扣减已落账
    StockDeducted,
    /// 新批次入库
    StockReceived,
    /// 扣减后进入低库存
    LowStock,
    /// 扣减后缺货
    OutOfStock,
    /// 缓存库存已按台账修正
    StockReconciled,
}

impl StockEventType {
    pub fn as_str(&self) -> &str {
        match self {
            StockEventType::StockDeducted => "StockDeducted",
            StockEventType::StockReceived => "StockReceived",
            StockEventType::LowStock => "LowStock",
            StockEventType::OutOfStock => "OutOfStock",
            StockEventType::StockReconciled => "StockReconciled",
        }
    }
}

/// 库存事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEvent {
    pub event_type: StockEventType,
    /// 受影响的原料
    pub ingredient_ids: Vec<String>,
    /// 关联单据（出库单号 / 批次号），可为空
    pub reference: Option<String>,
    /// 事件来源描述
    pub source: Option<String>,
}

impl StockEvent {
    pub fn new(event_type: StockEventType, ingredient_ids: Vec<String>, reference: Option<String>) -> Self {
        Self {
            event_type,
            ingredient_ids,
            reference,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 库存事件发布者
///
/// # 返回
/// - `Ok(id)`: 下游回执 ID（不支持时为空字符串）
/// - `Err`: 发布失败
pub trait StockEventPublisher: Send + Sync {
    fn publish(&self, event: StockEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl StockEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: StockEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            event_type = event.event_type.as_str(),
            ingredients = event.ingredient_ids.len(),
            "NoOpEventPublisher: 跳过事件发布"
        );
        Ok(String::new())
    }
}

/// 内存收集发布者（测试与嵌入式调用方使用）
#[derive(Debug, Default)]
pub struct CollectingEventPublisher {
    events: Mutex<Vec<StockEvent>>,
}

impl CollectingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收集事件的快照
    pub fn events(&self) -> Vec<StockEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl StockEventPublisher for CollectingEventPublisher {
    fn publish(&self, event: StockEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        let mut guard = self
            .events
            .lock()
            .map_err(|e| format!("事件缓冲区锁中毒: {}", e))?;
        guard.push(event);
        Ok(guard.len().to_string())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn StockEventPublisher>> 的使用；发布失败降级为 warn 日志
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn StockEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn StockEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者），错误不向上传播
    pub fn publish(&self, event: StockEvent) {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                event_type = event.event_type.as_str(),
                "OptionalEventPublisher: 未配置发布者，跳过事件"
            );
            return;
        };

        let event_type = event.event_type;
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(event_type = event_type.as_str(), error = %e, "库存事件发布失败");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
