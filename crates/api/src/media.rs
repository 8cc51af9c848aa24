//! Avatar storage via the Cloudinary HTTP API.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::config::Config;

const CLOUDINARY_API_URL: &str = "https://api.cloudinary.com";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image service not configured")]
    NotConfigured,
    #[error("image request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image operation rejected with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub public_id: String,
    #[serde(rename = "secure_url")]
    pub url: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload image data (a base64 data URI) into a folder.
    async fn upload(&self, data: &str, folder: &str) -> Result<UploadedImage, ImageError>;

    async fn delete(&self, public_id: &str) -> Result<(), ImageError>;
}

pub struct CloudinaryImageStore {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryImageStore {
    pub fn new(
        base_url: impl Into<String>,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CLOUDINARY_API_URL,
            config.cloudinary_cloud_name.clone(),
            config.cloudinary_api_key.clone(),
            config.cloudinary_api_secret.clone(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// SHA-256 request signature over the sorted parameter string.
    fn sign(&self, params: &str) -> String {
        let digest = Sha256::digest(format!("{params}{}", self.api_secret).as_bytes());
        hex::encode(digest)
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{action}", self.base_url, self.cloud_name)
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(&self, data: &str, folder: &str) -> Result<UploadedImage, ImageError> {
        if !self.is_enabled() {
            return Err(ImageError::NotConfigured);
        }

        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = self.sign(&format!("folder={folder}&timestamp={timestamp}"));

        let response = self
            .http
            .post(self.endpoint("upload"))
            .form(&[
                ("file", data),
                ("folder", folder),
                ("timestamp", &timestamp),
                ("api_key", &self.api_key),
                ("signature", &signature),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImageError::Rejected(response.status().as_u16()));
        }

        Ok(response.json::<UploadedImage>().await?)
    }

    async fn delete(&self, public_id: &str) -> Result<(), ImageError> {
        if !self.is_enabled() {
            return Err(ImageError::NotConfigured);
        }

        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = self.sign(&format!("public_id={public_id}&timestamp={timestamp}"));

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", &timestamp),
                ("api_key", &self.api_key),
                ("signature", &signature),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImageError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base_url: String) -> CloudinaryImageStore {
        CloudinaryImageStore::new(base_url, "demo", "key", "secret")
    }

    #[tokio::test]
    async fn upload_parses_the_uploaded_image() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1_1/demo/image/upload")
            .with_status(200)
            .with_body(
                r#"{"public_id":"avatars/abc123","secure_url":"https://res.cloudinary.com/demo/avatars/abc123.png"}"#,
            )
            .create_async()
            .await;

        let uploaded = store(server.url())
            .upload("data:image/png;base64,AAAA", "avatars")
            .await
            .unwrap();

        assert_eq!(uploaded.public_id, "avatars/abc123");
        assert!(uploaded.url.ends_with("abc123.png"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_upload_surfaces_the_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1_1/demo/image/upload")
            .with_status(401)
            .create_async()
            .await;

        let err = store(server.url())
            .upload("data:image/png;base64,AAAA", "avatars")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Rejected(401)));
    }

    #[test]
    fn signature_is_stable_for_equal_input() {
        let store = store("http://unused".to_string());
        assert_eq!(
            store.sign("folder=avatars&timestamp=100"),
            store.sign("folder=avatars&timestamp=100")
        );
        assert_ne!(
            store.sign("folder=avatars&timestamp=100"),
            store.sign("folder=avatars&timestamp=101")
        );
    }
}
