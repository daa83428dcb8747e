use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{
    errors::{AppError, Result},
    storage::{ObjectDownload, StorageProvider, StoredObject},
};

/// S3-compatible provider. With a custom endpoint this covers any vendor
/// speaking the S3 API, so several instances of this adapter (different
/// buckets, different vendors) can make up the provider list.
pub struct S3Provider {
    id: String,
    bucket: String,
    client: Client,
}

impl S3Provider {
    pub fn new(
        id: &str,
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "filedepot");

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(true);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            id: id.to_string(),
            bucket: bucket.to_string(),
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredObject> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("S3 put_object failed: {}", e)))?;

        Ok(StoredObject {
            provider_id: self.id.clone(),
            key: key.to_string(),
            location: format!("s3://{}/{}", self.bucket, key),
            size_bytes: data.len() as i64,
        })
    }

    async fn download(&self, key: &str) -> Result<ObjectDownload> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    AppError::ObjectMissing
                } else {
                    AppError::Backend(format!("S3 get_object failed: {}", service))
                }
            })?;

        let content_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Backend(format!("S3 body read failed: {}", e)))?
            .into_bytes();

        let size_bytes = body.len() as i64;

        Ok(ObjectDownload {
            stream: Box::new(std::io::Cursor::new(body)),
            content_type,
            size_bytes,
        })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        // DeleteObject succeeds on absent keys, so probe first to be able to
        // report the already-absent case.
        if let Err(e) = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            let service = e.into_service_error();
            if service.is_not_found() {
                return Ok(false);
            }
            return Err(AppError::Backend(format!("S3 head_object failed: {}", service)));
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("S3 delete_object failed: {}", e)))?;

        Ok(true)
    }

    async fn is_available(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
    }
}
