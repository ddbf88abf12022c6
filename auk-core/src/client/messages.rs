//! Outgoing message pipeline: inline sends, receipt correlation, and
//! the long/forward split path over the highway.

use rand::Rng;
use tokio::time::timeout;
use tracing::debug;

use crate::client::{unix_now, Client};
use crate::directory::group_uin_from_code;
use crate::error::AukError;
use crate::highway::upload_to_any;
use crate::message::{
    estimate_length, forward_template, image_count, long_template, Element, ForwardMessage,
    ForwardNode, GroupMessage, PrivateMessage, Sender, SendingMessage, INLINE_IMAGE_LIMIT,
    INLINE_LEN_LIMIT, MAX_ESTIMATED_LEN, MAX_IMAGE_COUNT,
};
use crate::network::Engine;
use crate::packet::PacketKind;
use crate::protocol::{commands, encode, Response};
use crate::protocol::messaging::{FriendSendRequest, GroupRecallRequest, GroupSendRequest};
use crate::protocol::multimsg::{
    LongMsgUploadBody, MultiApplyDownRequest, MultiApplyUpRequest, BU_TYPE_FORWARD, BU_TYPE_LONG,
    HIGHWAY_TYPE_MULTI_MSG,
};

// ── Outgoing classification ──────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SendClass {
    /// Too large for any path.
    Reject,
    /// Oversized for inline: goes out as a long message.
    Split,
    Inline,
}

pub(crate) fn classify(elements: &[Element]) -> SendClass {
    let length = estimate_length(elements);
    let images = image_count(elements);
    if length > MAX_ESTIMATED_LEN || images > MAX_IMAGE_COUNT {
        SendClass::Reject
    } else if length > INLINE_LEN_LIMIT || images > INLINE_IMAGE_LIMIT {
        SendClass::Split
    } else {
        SendClass::Inline
    }
}

/// Deregisters a receipt waiter on every exit path of an inline send.
struct ReceiptGuard<'a> {
    engine: &'a Engine,
    token: u64,
}

impl Drop for ReceiptGuard<'_> {
    fn drop(&mut self) {
        self.engine.receipts.deregister(self.token);
    }
}

impl Client {
    // ── Group messages ───────────────────────────────────────────

    /// Send a message to a group.
    ///
    /// Oversized messages are wrapped as a single-node bundle and
    /// shipped through the long-message path; messages beyond the hard
    /// ceiling are rejected without any network traffic.
    pub async fn send_group_message(
        &self,
        group_code: i64,
        message: SendingMessage,
    ) -> Result<GroupMessage, AukError> {
        match classify(&message.elements) {
            SendClass::Reject => Err(AukError::MessageTooLarge),
            SendClass::Split => {
                let bundle = ForwardMessage {
                    nodes: vec![ForwardNode {
                        sender_id: self.uin(),
                        sender_name: self.nickname(),
                        time: unix_now() as i32,
                        elements: message.elements,
                    }],
                };
                self.send_long_or_forward(group_code, true, &bundle).await
            }
            SendClass::Inline => self.send_group_message_inline(group_code, false, message).await,
        }
    }

    /// Send a caller-assembled forward bundle ("chat history").
    pub async fn send_group_forward_message(
        &self,
        group_code: i64,
        bundle: &ForwardMessage,
    ) -> Result<GroupMessage, AukError> {
        self.send_long_or_forward(group_code, false, bundle).await
    }

    /// Inline send with receipt correlation: the send carries a random
    /// tag, and the matching receipt delivers the assigned message id.
    /// When no receipt arrives in time the message still went out; it
    /// is returned with the placeholder id `-1`.
    async fn send_group_message_inline(
        &self,
        group_code: i64,
        forward: bool,
        message: SendingMessage,
    ) -> Result<GroupMessage, AukError> {
        let rand_tag: u32 = rand::random();
        let (token, receipt_rx) = self.engine.receipts.register(rand_tag);
        let _guard = ReceiptGuard { engine: self.engine.as_ref(), token };

        let body = encode(&GroupSendRequest {
            group_code,
            rand: rand_tag,
            forward,
            elements: message.elements.clone(),
        })?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::SEND_MESSAGE, body);
        self.engine.send(&envelope).await?;

        let mut sent = GroupMessage {
            id: -1,
            internal_id: rand_tag as i32,
            group_code,
            sender: Sender { uin: self.uin(), nickname: self.nickname(), is_friend: true },
            time: unix_now() as i32,
            elements: message.elements,
        };
        match timeout(self.engine.config.receipt_timeout(), receipt_rx).await {
            Ok(Ok(assigned)) => sent.id = assigned,
            _ => debug!(group_code, "no receipt; returning placeholder message id"),
        }
        Ok(sent)
    }

    /// Shared long-message / forward-bundle path: validation data →
    /// apply-up → highway upload → placeholder inline send.
    async fn send_long_or_forward(
        &self,
        group_code: i64,
        is_long: bool,
        bundle: &ForwardMessage,
    ) -> Result<GroupMessage, AukError> {
        if !bundle.uploadable() {
            return Err(AukError::BundleTooLarge(bundle.nodes.len()));
        }
        let ts = unix_now();
        let seq = self.engine.session.seqs.next_group_data_trans_seq();
        let nonce: i32 = rand::thread_rng().gen_range(0..i32::MAX);
        let (data, hash) = bundle.validation_data(seq, nonce, group_code)?;

        let dst_uin = group_uin_from_code(group_code);
        let body = encode(&MultiApplyUpRequest {
            dst_uin,
            msg_size: data.len() as i64,
            msg_hash: hash.to_vec(),
            bu_type: if is_long { BU_TYPE_LONG } else { BU_TYPE_FORWARD },
        })?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::MULTI_APPLY_UP, body);
        let ticket = match self.engine.send_and_wait(&envelope).await? {
            Some(Response::MultiApplyUp(ticket)) => ticket,
            _ => return Err(AukError::UnexpectedResponse { command: commands::MULTI_APPLY_UP }),
        };

        let upload_body =
            encode(&LongMsgUploadBody::new(dst_uin, ticket.msg_ukey.clone(), data))?;
        upload_to_any(
            self.engine.highway.as_ref(),
            &ticket.servers,
            &ticket.msg_sig,
            &upload_body,
            HIGHWAY_TYPE_MULTI_MSG,
        )
        .await?;

        if is_long {
            let placeholder = long_template(&ticket.msg_resid, &bundle.brief(), ts);
            self.send_group_message_inline(group_code, false, placeholder).await
        } else {
            let placeholder =
                forward_template(&ticket.msg_resid, &bundle.preview(), bundle.nodes.len(), ts);
            self.send_group_message_inline(group_code, true, placeholder).await
        }
    }

    /// Retrieve a previously uploaded forward bundle by resource id.
    pub async fn get_forward_message(&self, res_id: &str) -> Result<ForwardMessage, AukError> {
        let body = encode(&MultiApplyDownRequest { res_id: res_id.to_owned() })?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::MULTI_APPLY_DOWN, body);
        let response = match self.engine.send_and_wait(&envelope).await? {
            Some(Response::MultiApplyDown(response)) => response,
            _ => return Err(AukError::UnexpectedResponse { command: commands::MULTI_APPLY_DOWN }),
        };
        let nodes = response
            .messages
            .into_iter()
            .map(|m| {
                let sender_name = m.sender_name().to_owned();
                ForwardNode { sender_id: m.from_uin, sender_name, time: m.time, elements: m.elements }
            })
            .collect();
        Ok(ForwardMessage { nodes })
    }

    // ── Private messages ─────────────────────────────────────────

    /// Send a 1:1 message. The locally allocated friend sequence is the
    /// message id; there is no receipt round.
    pub async fn send_private_message(
        &self,
        target: i64,
        message: SendingMessage,
    ) -> Result<PrivateMessage, AukError> {
        let rand_tag: u32 = rand::random();
        let seq = self.engine.session.seqs.next_friend_seq();
        let time = unix_now();
        let body = encode(&FriendSendRequest {
            target,
            seq,
            rand: rand_tag,
            time,
            elements: message.elements.clone(),
        })?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::SEND_MESSAGE, body);
        self.engine.send(&envelope).await?;

        Ok(PrivateMessage {
            id: seq,
            internal_id: rand_tag as i32,
            target,
            sender: Sender { uin: self.uin(), nickname: self.nickname(), is_friend: true },
            time: time as i32,
            elements: message.elements,
        })
    }

    // ── Recall ───────────────────────────────────────────────────

    /// Recall a previously sent group message. Fire-and-forget.
    pub async fn recall_group_message(
        &self,
        group_code: i64,
        msg_id: i32,
        msg_internal_id: i32,
    ) -> Result<(), AukError> {
        let body = encode(&GroupRecallRequest { group_code, msg_id, msg_internal_id })?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::GROUP_RECALL, body);
        self.engine.send(&envelope).await
    }
}

// ── Tests ────────────────────────────────────────────────────────
