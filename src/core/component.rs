//! Plain text chat components.
//!
//! Disconnect reasons and chat prompts are sent as JSON text before 1.20.3
//! and as a nameless NBT compound from 1.20.3 on.

use bytes::BufMut;
use serde::Serialize;

use crate::core::nbt::{Compound, Tag};
use crate::core::wire::WireWrite;
use crate::protocol::version::ProtocolVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextComponent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<TextComponent>,
}

impl TextComponent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: false,
            extra: Vec::new(),
        }
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_owned());
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn append(mut self, child: TextComponent) -> Self {
        self.extra.push(child);
        self
    }

    pub fn to_json(&self) -> String {
        // Serializing a struct of strings and bools cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"text\":{:?}}}", self.text))
    }

    pub fn to_nbt(&self) -> Compound {
        let mut tag = Compound::new().with("text", self.text.as_str());
        if let Some(color) = &self.color {
            tag.insert("color", color.as_str());
        }
        if self.bold {
            tag.insert("bold", true);
        }
        if !self.extra.is_empty() {
            let children = self.extra.iter().map(|c| Tag::Compound(c.to_nbt())).collect();
            tag.insert("extra", Tag::List(children));
        }
        tag
    }

    /// Write in the representation `version` expects.
    pub fn write<B: BufMut + ?Sized>(&self, dst: &mut B, version: ProtocolVersion) {
        if version >= ProtocolVersion::V1_20_3 {
            self.to_nbt().write_nameless(dst);
        } else {
            dst.put_string(&self.to_json());
        }
    }

    /// Raw text of this component and its children.
    pub fn plain(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.extra {
            out.push_str(&child.plain());
        }
        out
    }
}

impl From<&str> for TextComponent {
    fn from(value: &str) -> Self {
        TextComponent::text(value)
    }
}
