//! 实验 sense：生成单文件交互式 HTML 片段

use std::sync::Arc;

use chrono::Utc;

use crate::core::domain::{Artifact, SenseType};
use crate::llm::LlmCapability;

const PROMPT: &str = "Create a single self-contained interactive HTML snippet \
(inline <style> and <script>, no external resources) that lets a learner \
explore the following topic hands-on. Output only the HTML, no commentary.\n\nTopic: ";

pub async fn generate(capability: &Arc<dyn LlmCapability>, topic: &str) -> Artifact {
    let body = if capability.enabled() {
        match capability.generate(&format!("{}{}", PROMPT, topic)).await {
            Ok(html) if html.contains('<') => html,
            Ok(_) | Err(_) => unavailable_html(topic),
        }
    } else {
        unavailable_html(topic)
    };

    Artifact {
        id: uuid::Uuid::new_v4().to_string(),
        sense: SenseType::Experiment,
        title: format!("Experiment: {}", topic),
        body,
        url: None,
        created_at: Utc::now(),
    }
}

fn unavailable_html(topic: &str) -> String {
    format!(
        "<div class=\"experiment-unavailable\"><p>Interactive experiment for \
         <strong>{}</strong> is unavailable right now.</p></div>",
        topic
    )
}
