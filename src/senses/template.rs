//! 模板 sense：未专门支持的标签走静态模板，不触发任何 LLM 调用

use chrono::Utc;

use crate::core::domain::{Artifact, SenseType};

pub fn render(sense: SenseType, topic: &str) -> Artifact {
    let body = match sense {
        SenseType::Visual => format!(
            "A visual walkthrough of {} will appear here. Sketch the core idea \
             as a diagram before reading on.",
            topic
        ),
        SenseType::Narrative => format!(
            "Story time: imagine explaining {} to a curious friend. What would \
             the opening sentence be?",
            topic
        ),
        _ => format!("Supplementary material for {}.", topic),
    };

    Artifact {
        id: uuid::Uuid::new_v4().to_string(),
        sense,
        title: format!("Perspective: {}", topic),
        body,
        url: None,
        created_at: Utc::now(),
    }
}
