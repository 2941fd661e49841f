//! Attachment upload client.
//!
//! The upload service accepts raw bytes and returns a stable URL; the engine
//! only ever references that URL in message metadata.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

use super::{error_from_response, map_transport_error, ApiClient};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

impl ApiClient {
    /// Upload attachment bytes and return the stable URL the service issued.
    pub async fn upload_attachment(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let file_name = normalize_text_option(Some(file_name.to_string()))
            .ok_or_else(|| Error::Validation("attachment file name must not be empty".to_string()))?;
        let token = self.session().session()?.access_token;
        let encoded_name = urlencoding::encode(&file_name);
        let url = format!("{}/v1/uploads?fileName={encoded_name}", self.base_url());

        let response = self
            .http_client()
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.send_timeout())
            .body(bytes)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let payload = response
            .json::<UploadResponse>()
            .await
            .map_err(|error| Error::Api(format!("failed to decode upload response: {error}")))?;
        normalize_text_option(payload.url)
            .ok_or_else(|| Error::Api("upload response did not include a url".to_string()))
    }
}
