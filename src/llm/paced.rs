//! 外呼节流与限流退避包装
//!
//! 进程级共享闸门：相邻请求之间保证最小间隔；命中 RateLimited 时做有界指数退避
//! 重试。包装任意 LlmCapability 实现。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::PacingSection;
use crate::core::error::LlmError;
use crate::llm::traits::LlmCapability;

/// 进程级节流闸门；clone 后共享同一把锁
#[derive(Clone)]
pub struct PacingGate {
    last_request_at: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl PacingGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request_at: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    /// 等到距上次放行至少 min_interval 后放行，并记录本次时刻
    pub async fn acquire(&self) {
        let mut last = self.last_request_at.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// 节流 + 退避重试包装
pub struct PacedCapability {
    inner: Arc<dyn LlmCapability>,
    gate: PacingGate,
    retry_attempts: u32,
    backoff_base: Duration,
}

impl PacedCapability {
    pub fn new(inner: Arc<dyn LlmCapability>, pacing: &PacingSection) -> Self {
        Self {
            inner,
            gate: PacingGate::new(Duration::from_millis(pacing.min_interval_ms)),
            retry_attempts: pacing.retry_attempts.max(1),
            backoff_base: Duration::from_millis(pacing.backoff_base_ms),
        }
    }

    async fn with_retry<F, Fut>(&self, call: F) -> Result<String, LlmError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<String, LlmError>>,
    {
        let mut attempt = 0u32;
        loop {
            self.gate.acquire().await;
            match call().await {
                Ok(out) => return Ok(out),
                Err(LlmError::RateLimited) if attempt + 1 < self.retry_attempts => {
                    let backoff = self.backoff_base * 2u32.pow(attempt);
                    tracing::warn!(attempt, backoff_ms = backoff.as_millis() as u64, "llm rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl LlmCapability for PacedCapability {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.with_retry(|| self.inner.generate(prompt)).await
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, LlmError> {
        self.with_retry(|| self.inner.generate_image(prompt)).await
    }

    fn enabled(&self) -> bool {
        self.inner.enabled()
    }
}
