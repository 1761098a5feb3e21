//! 协调器：按固定优先级串行执行 agent
//!
//! 注册时按 priority 降序稳定排序（同值保持注册顺序）。每个 agent 观察到的
//! 是前序 agent 补丁已生效的状态与不变的信号批次。补丁浅覆盖合并，意图写入
//! 轮次产出并以"同类最新覆盖"进入 pending；consumes 先于 intents 处理。

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::agents::{Agent, AgentInput};
use crate::core::intent::{push_latest_wins, AgentIntent};
use crate::core::state::{EvidenceSignal, SharedState};

pub struct Coordinator {
    agents: Vec<Arc<dyn Agent>>,
}

/// 一轮 pass 的产出
#[derive(Debug, Default)]
pub struct PassOutcome {
    pub intents: Vec<AgentIntent>,
    pub notes: Vec<String>,
    pub patched: bool,
}

impl Coordinator {
    pub fn new(mut agents: Vec<Arc<dyn Agent>>) -> Self {
        // sort_by_key 是稳定排序，同优先级按注册顺序
        agents.sort_by_key(|a| std::cmp::Reverse(a.priority()));
        Self { agents }
    }

    pub fn agent_order(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.id()).collect()
    }

    pub async fn run_pass(
        &self,
        state: &mut SharedState,
        signals: &[EvidenceSignal],
        now: DateTime<Utc>,
    ) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        for agent in &self.agents {
            let update = agent
                .observe(AgentInput {
                    now,
                    new_signals: signals,
                    state,
                })
                .await;
            let Some(update) = update else { continue };
            tracing::debug!(
                agent = agent.id(),
                intents = update.intents.len(),
                has_patch = update.state_patch.is_some(),
                "agent contributed"
            );

            for kind in &update.consumes {
                state.pending_intents.retain(|i| i.kind() != *kind);
            }
            for intent in update.intents {
                outcome.intents.push(intent.clone());
                push_latest_wins(&mut state.pending_intents, intent);
            }
            if let Some(patch) = update.state_patch {
                if !patch.is_empty() {
                    state.apply(patch, now);
                    outcome.patched = true;
                }
            }
            outcome.notes.extend(update.notes);
        }
        outcome
    }
}
