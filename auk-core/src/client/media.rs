//! Image upload and query.
//!
//! Both channels are dedup-first: the content hash is offered to the
//! server before any bytes move, and a known hash short-circuits the
//! highway transfer entirely.

use tracing::debug;

use crate::client::Client;
use crate::error::AukError;
use crate::highway::upload_to_any;
use crate::message::Element;
use crate::packet::PacketKind;
use crate::protocol::{commands, encode, Response};
use crate::protocol::image::{
    image_resource_id, GroupImageStoreRequest, ImageStoreResponse, OffPicUpRequest,
    HIGHWAY_TYPE_IMAGE,
};

impl Client {
    async fn image_store_round(
        &self,
        command: &'static str,
        body: Vec<u8>,
    ) -> Result<ImageStoreResponse, AukError> {
        let envelope = self.engine.envelope(PacketKind::Simple, command, body);
        let response = match self.engine.send_and_wait(&envelope).await? {
            Some(Response::ImageStore(response)) => response,
            _ => return Err(AukError::UnexpectedResponse { command }),
        };
        if response.result_code != 0 {
            return Err(AukError::ServerReject {
                code: response.result_code,
                message: response.message,
            });
        }
        Ok(response)
    }

    // ── Group images ─────────────────────────────────────────────

    /// Upload an image for use in group messages, skipping the transfer
    /// when the group already knows the content hash.
    pub async fn upload_group_image(
        &self,
        group_code: i64,
        image: &[u8],
    ) -> Result<Element, AukError> {
        let hash = blake3::hash(image).as_bytes().to_vec();
        let request = GroupImageStoreRequest {
            group_code,
            hash: hash.clone(),
            size: image.len() as i32,
        };
        let response = self.image_store_round(commands::GROUP_PIC_UP, encode(&request)?).await?;
        if response.exists {
            return Ok(Element::GroupImage { resource_id: image_resource_id(&hash), hash });
        }
        upload_to_any(
            self.engine.highway.as_ref(),
            &response.servers,
            &response.upload_key,
            image,
            HIGHWAY_TYPE_IMAGE,
        )
        .await?;
        Ok(Element::GroupImage { resource_id: image_resource_id(&hash), hash })
    }

    /// Ask whether a group already holds an image with this hash.
    pub async fn query_group_image(
        &self,
        group_code: i64,
        hash: &[u8],
        size: i32,
    ) -> Result<Element, AukError> {
        let request =
            GroupImageStoreRequest { group_code, hash: hash.to_vec(), size };
        let response = self.image_store_round(commands::GROUP_PIC_UP, encode(&request)?).await?;
        if !response.exists {
            return Err(AukError::ImageNotExists);
        }
        Ok(Element::GroupImage { resource_id: image_resource_id(hash), hash: hash.to_vec() })
    }

    // ── 1:1 images ───────────────────────────────────────────────

    /// Ask whether the 1:1 channel already holds an image with this
    /// hash; the response carries the cross-referenceable image id.
    pub async fn query_friend_image(
        &self,
        target: i64,
        hash: &[u8],
        size: i32,
    ) -> Result<Element, AukError> {
        let request = OffPicUpRequest { target, hash: hash.to_vec(), size };
        let response = self.image_store_round(commands::OFF_PIC_UP, encode(&request)?).await?;
        if !response.exists {
            return Err(AukError::ImageNotExists);
        }
        Ok(Element::FriendImage { image_id: response.resource_id, hash: hash.to_vec() })
    }

    /// Upload an image for 1:1 use.
    ///
    /// The 1:1 dedup state only becomes discoverable after a group-style
    /// upload populates it, so on a miss the image goes up through the
    /// group channel (target as pseudo-group) and the query is retried,
    /// bounded to five rounds.
    pub async fn upload_private_image(
        &self,
        target: i64,
        image: &[u8],
    ) -> Result<Element, AukError> {
        let hash = blake3::hash(image).as_bytes().to_vec();
        for attempt in 0..5 {
            match self.query_friend_image(target, &hash, image.len() as i32).await {
                Ok(element) => return Ok(element),
                Err(e) => {
                    debug!(attempt, error = %e, "friend image not known yet");
                    self.upload_group_image(target, image).await?;
                }
            }
        }
        Err(AukError::UploadFailed)
    }
}
