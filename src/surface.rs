//! 动态 UI 布局文档
//!
//! 递归 `{type: flex|component}` 树；componentName 为封闭枚举，反序列化遇到
//! 未知组件名直接报错，防止渲染端收到无法识别的标签。

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 渲染端支持的组件全集（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentName {
    Heading,
    Text,
    Button,
    Input,
    Select,
    Card,
    Divider,
    SvgBlock,
    MermaidBlock,
    CodeBlock,
    QuizBlock,
    ExperimentViewer,
    Image,
    Box,
    Stack,
    VStack,
    HStack,
    Flex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlexDirection {
    #[default]
    Column,
    Row,
}

/// 布局树节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SurfaceNode {
    Flex {
        #[serde(default)]
        direction: FlexDirection,
        #[serde(default)]
        children: Vec<SurfaceNode>,
    },
    Component {
        #[serde(rename = "componentName")]
        component_name: ComponentName,
        #[serde(default)]
        props: Value,
        #[serde(default)]
        children: Vec<SurfaceNode>,
    },
}

impl SurfaceNode {
    pub fn column(children: Vec<SurfaceNode>) -> Self {
        SurfaceNode::Flex {
            direction: FlexDirection::Column,
            children,
        }
    }

    pub fn row(children: Vec<SurfaceNode>) -> Self {
        SurfaceNode::Flex {
            direction: FlexDirection::Row,
            children,
        }
    }

    pub fn component(name: ComponentName, props: Value) -> Self {
        SurfaceNode::Component {
            component_name: name,
            props,
            children: Vec::new(),
        }
    }

    pub fn heading(text: &str, level: u8) -> Self {
        Self::component(ComponentName::Heading, json!({"text": text, "level": level}))
    }

    pub fn text(text: &str) -> Self {
        Self::component(ComponentName::Text, json!({"text": text}))
    }

    /// 按钮点击会以 ui-intent 信号回流，action 即 payload.action
    pub fn button(label: &str, action: &str, extra: Value) -> Self {
        let mut props = json!({"label": label, "action": action});
        if let (Some(map), Value::Object(extra_map)) = (props.as_object_mut(), extra) {
            for (k, v) in extra_map {
                map.insert(k, v);
            }
        }
        Self::component(ComponentName::Button, props)
    }

    pub fn input(id: &str, placeholder: &str, value: &str) -> Self {
        Self::component(
            ComponentName::Input,
            json!({"id": id, "placeholder": placeholder, "value": value}),
        )
    }

    pub fn select(id: &str, options: &[String], value: &str) -> Self {
        Self::component(
            ComponentName::Select,
            json!({"id": id, "options": options, "value": value}),
        )
    }

    pub fn card(title: &str, children: Vec<SurfaceNode>) -> Self {
        SurfaceNode::Component {
            component_name: ComponentName::Card,
            props: json!({"title": title}),
            children,
        }
    }

    pub fn divider() -> Self {
        Self::component(ComponentName::Divider, json!({}))
    }

    pub fn mermaid(code: &str, unit_id: &str, media_index: usize) -> Self {
        Self::component(
            ComponentName::MermaidBlock,
            json!({"code": code, "unitId": unit_id, "mediaIndex": media_index}),
        )
    }

    pub fn code_block(code: &str, language: &str) -> Self {
        Self::component(
            ComponentName::CodeBlock,
            json!({"code": code, "language": language}),
        )
    }

    pub fn quiz(question: &str, unit_id: &str, media_index: usize) -> Self {
        Self::component(
            ComponentName::QuizBlock,
            json!({"question": question, "unitId": unit_id, "mediaIndex": media_index}),
        )
    }

    pub fn image(url: &str, caption: &str) -> Self {
        Self::component(ComponentName::Image, json!({"url": url, "caption": caption}))
    }

    pub fn experiment_viewer(html: &str, title: &str) -> Self {
        Self::component(
            ComponentName::ExperimentViewer,
            json!({"html": html, "title": title}),
        )
    }
}
