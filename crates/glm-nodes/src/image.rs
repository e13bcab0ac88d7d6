//! Image reference selection for the vision node.
//!
//! The service takes images as an `image_url` content part whose `url` is
//! either a fetchable URL or a `data:image/<subtype>;base64,<payload>` URI.
//! Raw base64 without the wrapper is assumed to be JPEG. That guess is wrong
//! for PNG or WEBP payloads, so it is logged every time it is made.

use crate::NodeError;
use tracing::{info, warn};

/// Prefix recognized as an existing data URI wrapper.
pub const DATA_URI_MARKER: &str = "data:image/";

/// Prefix prepended to raw base64 image data.
pub const DEFAULT_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Exactly one image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// A URL the service fetches itself.
    Url(String),
    /// Base64 image data, with or without the data URI wrapper.
    Data(String),
}

impl ImageInput {
    /// Choose between the two node inputs. Both are trimmed; blank means
    /// absent. If both are present the data wins.
    pub fn select(image_base64: &str, image_url: &str) -> Result<Self, NodeError> {
        let data = image_base64.trim();
        let url = image_url.trim();
        match (data.is_empty(), url.is_empty()) {
            (true, true) => Err(NodeError::MissingImage),
            (false, false) => {
                warn!("both an image URL and base64 image data were provided, using the data");
                Ok(ImageInput::Data(data.to_string()))
            }
            (false, true) => Ok(ImageInput::Data(data.to_string())),
            (true, false) => Ok(ImageInput::Url(url.to_string())),
        }
    }

    /// The value for the `image_url.url` field.
    pub fn into_url(self) -> String {
        match self {
            ImageInput::Url(url) => {
                info!("using image URL: {url}");
                url
            }
            ImageInput::Data(data) => ensure_data_uri(&data),
        }
    }
}

/// Wrap raw base64 in a JPEG data URI unless it already has a
/// `data:image/` wrapper.
pub fn ensure_data_uri(data: &str) -> String {
    if data.starts_with(DATA_URI_MARKER) {
        info!("using base64 image data with its data URI wrapper");
        data.to_string()
    } else {
        warn!(
            "base64 image data lacks a 'data:image/...;base64,' prefix, assuming JPEG and \
             prepending '{DEFAULT_DATA_URI_PREFIX}'. Non-JPEG images may fail to decode; \
             provide a full data URI upstream"
        );
        format!("{DEFAULT_DATA_URI_PREFIX}{data}")
    }
}
