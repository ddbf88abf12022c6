//! Image store payloads (group pic-up and 1:1 off-pic-up).

use serde::{Deserialize, Serialize};

use super::ServerAddr;

/// Highway business type for image bodies.
pub const HIGHWAY_TYPE_IMAGE: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupImageStoreRequest {
    pub group_code: i64,
    pub hash: Vec<u8>,
    pub size: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OffPicUpRequest {
    pub target: i64,
    pub hash: Vec<u8>,
    pub size: i32,
}

/// Answer to either image-store query. `exists` short-circuits the
/// upload entirely; otherwise `upload_key` + `servers` form the ticket
/// for the highway transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageStoreResponse {
    pub result_code: i32,
    pub message: String,
    pub exists: bool,
    /// Server-side image id, set when `exists` (1:1 path).
    pub resource_id: String,
    pub upload_key: Vec<u8>,
    pub servers: Vec<ServerAddr>,
}

/// Derive the inline resource id for a group image from its content
/// hash: hex digest in braces with an image suffix.
pub fn image_resource_id(hash: &[u8]) -> String {
    let mut hex = String::with_capacity(hash.len() * 2);
    for b in hash {
        hex.push_str(&format!("{b:02X}"));
    }
    format!("{{{hex}}}.png")
}
