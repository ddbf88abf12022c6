//! Message model: elements, size estimation, forward bundles and the
//! placeholder templates synthesized after a highway upload.

use serde::{Deserialize, Serialize};

use crate::error::AukError;

/// Hard ceiling on an outgoing group message's estimated length; above
/// this even the split path refuses it.
pub const MAX_ESTIMATED_LEN: usize = 5000;
/// Above this estimated length an outgoing message travels as a long
/// message instead of inline.
pub const INLINE_LEN_LIMIT: usize = 702;
/// Hard ceiling on image elements per message.
pub const MAX_IMAGE_COUNT: usize = 50;
/// Above this image count an outgoing message travels as a long message.
pub const INLINE_IMAGE_LIMIT: usize = 2;
/// A forward bundle must stay below this node count to be uploadable.
pub const MAX_FORWARD_NODES: usize = 200;

// ── Elements ─────────────────────────────────────────────────────

/// One element of a message body, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Text {
        content: String,
    },
    At {
        target: i64,
        display: String,
    },
    Face {
        index: i32,
    },
    GroupImage {
        resource_id: String,
        hash: Vec<u8>,
    },
    FriendImage {
        image_id: String,
        hash: Vec<u8>,
    },
    /// Rich-content service element carrying an XML template (used for
    /// long-message and forward-bundle placeholders).
    Service {
        service_id: i32,
        template: String,
    },
}

impl Element {
    pub fn text(content: impl Into<String>) -> Self {
        Element::Text { content: content.into() }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Element::GroupImage { .. } | Element::FriendImage { .. })
    }

    /// Contribution to the serialized-size estimate. Images count a
    /// fixed overhead since their bodies travel out-of-band.
    fn estimated_len(&self) -> usize {
        match self {
            Element::Text { content } => content.len(),
            Element::At { display, .. } => display.len() + 4,
            Element::Face { .. } => 12,
            Element::GroupImage { .. } | Element::FriendImage { .. } => 100,
            Element::Service { template, .. } => template.len(),
        }
    }
}

/// Estimated serialized length of an element sequence.
pub fn estimate_length(elements: &[Element]) -> usize {
    elements.iter().map(Element::estimated_len).sum()
}

/// Number of image elements in a sequence.
pub fn image_count(elements: &[Element]) -> usize {
    elements.iter().filter(|e| e.is_image()).count()
}

/// Flatten an element sequence to human-readable text, the way message
/// previews render it.
pub fn to_readable_string(elements: &[Element]) -> String {
    let mut out = String::new();
    for e in elements {
        match e {
            Element::Text { content } => out.push_str(content),
            Element::At { display, .. } => out.push_str(display),
            Element::Face { .. } => out.push_str("[表情]"),
            Element::GroupImage { .. } | Element::FriendImage { .. } => out.push_str("[图片]"),
            Element::Service { .. } => out.push_str("[服务消息]"),
        }
    }
    out
}

// ── Sending / received messages ──────────────────────────────────

/// An outgoing message body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendingMessage {
    pub elements: Vec<Element>,
}

impl SendingMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }
}

/// Sender metadata attached to received/echoed messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    pub uin: i64,
    pub nickname: String,
    pub is_friend: bool,
}

/// A message delivered to (or echoed back from) a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Server-assigned message id, or `-1` when the send went out but
    /// its receipt never arrived.
    pub id: i32,
    /// Client-chosen random tag used for receipt correlation.
    pub internal_id: i32,
    pub group_code: i64,
    pub sender: Sender,
    pub time: i32,
    pub elements: Vec<Element>,
}

/// A 1:1 message. The locally allocated friend sequence stands in as
/// the message id immediately; there is no receipt round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub id: i32,
    pub internal_id: i32,
    pub target: i64,
    pub sender: Sender,
    pub time: i32,
    pub elements: Vec<Element>,
}

// ── Forward bundles ──────────────────────────────────────────────

/// One node of a forward bundle: a message plus its sender metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardNode {
    pub sender_id: i64,
    pub sender_name: String,
    pub time: i32,
    pub elements: Vec<Element>,
}

/// A "forwarded chat history" bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForwardMessage {
    pub nodes: Vec<ForwardNode>,
}

/// Serialized-and-hashed bundle content handed to the apply-up round.
#[derive(Debug, Serialize, Deserialize)]
struct ValidationPayload {
    seq: i32,
    nonce: i32,
    group_code: i64,
    nodes: Vec<ForwardNode>,
}

impl ForwardMessage {
    /// Whether this bundle is small enough for the highway path.
    pub fn uploadable(&self) -> bool {
        self.nodes.len() < MAX_FORWARD_NODES
    }

    /// Serialize and compress the bundle, keyed by a fresh data-transfer
    /// sequence, a random 31-bit nonce and the destination group, and
    /// hash the result for the upload-slot request.
    pub fn validation_data(
        &self,
        seq: i32,
        nonce: i32,
        group_code: i64,
    ) -> Result<(Vec<u8>, [u8; 32]), AukError> {
        let payload = ValidationPayload {
            seq,
            nonce,
            group_code,
            nodes: self.nodes.clone(),
        };
        let raw = bincode::serialize(&payload)?;
        let data = zstd::stream::encode_all(std::io::Cursor::new(raw), 0)
            .map_err(|e| AukError::Encoding(e.to_string()))?;
        let hash = *blake3::hash(&data).as_bytes();
        Ok((data, hash))
    }

    /// Preview line for the forward placeholder: up to the first four
    /// nodes, flattened.
    pub fn preview(&self) -> String {
        let mut pv = String::new();
        for node in self.nodes.iter().take(4) {
            pv.push_str(&format!(
                r##"<title size="26" color="#777777">{}: {}</title>"##,
                node.sender_name,
                to_readable_string(&node.elements)
            ));
        }
        pv
    }

    /// Brief line for the long-message placeholder: node text
    /// concatenated until 27 characters are reached.
    pub fn brief(&self) -> String {
        let mut r = String::new();
        for node in &self.nodes {
            r.push_str(&to_readable_string(&node.elements));
            if r.len() >= 27 {
                break;
            }
        }
        r
    }
}

// ── Placeholder templates ────────────────────────────────────────

/// Inline placeholder for an uploaded forward bundle.
pub fn forward_template(res_id: &str, preview: &str, node_count: usize, ts: i64) -> SendingMessage {
    let template = format!(
        concat!(
            r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>"#,
            r#"<msg serviceID="35" templateID="1" action="viewMultiMsg" brief="[聊天记录]" "#,
            r#"m_resid="{res_id}" m_fileName="{ts}" tSum="3" sourceMsgId="0" url="" flag="3" adverSign="0" multiMsgFlag="0">"#,
            r#"<item layout="1"><title size="34" maxLines="2" lineSpace="12">群聊的聊天记录</title>{preview}"#,
            r##"<hr hidden="false" style="0" /><summary size="26" color="#777777">查看 {count} 条转发消息</summary></item>"##,
            r#"<source name="聊天记录" icon="" action="" appid="-1" /></msg>"#
        ),
        res_id = res_id,
        ts = ts,
        preview = preview,
        count = node_count,
    );
    SendingMessage::new().append(Element::Service { service_id: 35, template })
}

/// Inline placeholder for an uploaded long message.
pub fn long_template(res_id: &str, brief: &str, ts: i64) -> SendingMessage {
    let template = format!(
        concat!(
            r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>"#,
            r#"<msg serviceID="35" templateID="1" action="viewMultiMsg" brief="{brief}…" "#,
            r#"m_resid="{res_id}" m_fileName="{ts}" sourceMsgId="0" url="" flag="3" adverSign="0" multiMsgFlag="1">"#,
            r#"<item layout="1"><title>{brief}…</title><hr hidden="false" style="0" />"#,
            r#"<summary>点击查看完整消息</summary></item>"#,
            r#"<source name="聊天记录" icon="" action="" appid="-1" /></msg>"#
        ),
        brief = brief,
        res_id = res_id,
        ts = ts,
    );
    SendingMessage::new().append(Element::Service { service_id: 35, template })
}

// ── Tests ────────────────────────────────────────────────────────
