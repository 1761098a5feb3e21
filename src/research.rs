//! 课程起草前的外部检索
//!
//! Wikipedia REST 摘要 + OpenAlex 论文检索，合并为 ResearchResult 供课程提示词
//! 引用。任何一路失败都只降级为空结果，不阻塞课程生成。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ResearchSection;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSource {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub topic: String,
    pub sources: Vec<ResearchSource>,
    pub notes: String,
}

impl ResearchResult {
    pub fn empty(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            sources: Vec::new(),
            notes: String::new(),
        }
    }

    /// 拼成提示词片段，长度有上限（提示词预算）
    pub fn as_prompt_context(&self, max_chars: usize) -> String {
        let mut out = String::new();
        for source in &self.sources {
            out.push_str(&format!("- {} ({})\n  {}\n", source.title, source.url, source.summary));
        }
        if !self.notes.is_empty() {
            out.push_str(&self.notes);
        }
        if out.len() > max_chars {
            let mut cut = max_chars;
            while !out.is_char_boundary(cut) {
                cut -= 1;
            }
            out.truncate(cut);
        }
        out
    }
}

/// 检索提供方抽象；测试中可替换为固定结果
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    async fn research(&self, topic: &str) -> ResearchResult;
}

/// HTTP 实现：Wikipedia 摘要 + OpenAlex works 检索
pub struct HttpResearchProvider {
    http: reqwest::Client,
}

impl HttpResearchProvider {
    pub fn new(cfg: &ResearchSection) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { http }
    }

    async fn wikipedia_summary(&self, topic: &str) -> Option<ResearchSource> {
        let slug = topic.replace(' ', "_");
        let url = format!("https://en.wikipedia.org/api/rest_v1/page/summary/{}", slug);
        let value: Value = self.http.get(&url).send().await.ok()?.json().await.ok()?;
        let title = value["title"].as_str()?.to_string();
        let summary = value["extract"].as_str().unwrap_or("").to_string();
        let page_url = value["content_urls"]["desktop"]["page"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Some(ResearchSource {
            title,
            url: page_url,
            summary,
        })
    }

    async fn openalex_works(&self, topic: &str) -> Vec<ResearchSource> {
        let url = format!(
            "https://api.openalex.org/works?search={}&per-page=5",
            urlencode(topic)
        );
        let value: Value = match self.http.get(&url).send().await {
            Ok(resp) => match resp.json().await {
                Ok(v) => v,
                Err(_) => return Vec::new(),
            },
            Err(_) => return Vec::new(),
        };
        value["results"]
            .as_array()
            .map(|works| {
                works
                    .iter()
                    .filter_map(|w| {
                        Some(ResearchSource {
                            title: w["display_name"].as_str()?.to_string(),
                            url: w["id"].as_str().unwrap_or("").to_string(),
                            summary: String::new(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResearchProvider for HttpResearchProvider {
    async fn research(&self, topic: &str) -> ResearchResult {
        let mut sources = Vec::new();
        if let Some(wiki) = self.wikipedia_summary(topic).await {
            sources.push(wiki);
        }
        sources.extend(self.openalex_works(topic).await);
        tracing::debug!(topic, sources = sources.len(), "research lookup finished");
        ResearchResult {
            topic: topic.to_string(),
            sources,
            notes: String::new(),
        }
    }
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c.to_string()
            } else if c == ' ' {
                "%20".to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_context_is_truncated() {
        let result = ResearchResult {
            topic: "quantum".into(),
            sources: vec![ResearchSource {
                title: "T".into(),
                url: "https://example.org".into(),
                summary: "s".repeat(10_000),
            }],
            notes: String::new(),
        };
        let ctx = result.as_prompt_context(4000);
        assert!(ctx.len() <= 4000);
    }
}
