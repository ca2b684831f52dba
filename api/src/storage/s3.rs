//! S3 upload backend.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use tracing::debug;

use super::{ObjectStorage, StorageError, UploadObject};

#[derive(Debug, Clone)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    /// Custom endpoint (MinIO, LocalStack). Switches to path-style URLs.
    pub endpoint: Option<String>,
}

impl S3Config {
    /// Public URL of an object uploaded with a `public-read` ACL.
    pub fn object_url(&self, key: &str) -> String {
        let key = urlencoding::encode(key);
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.bucket,
                key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    config: S3Config,
}

impl S3Storage {
    /// Build a client with the static credentials from `config`.
    pub async fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "posts-api",
        );

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            config,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(&self, object: UploadObject) -> Result<String, StorageError> {
        let size = object.body.len();
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object.key)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(&object.content_type)
            .metadata("fieldName", &object.field_name)
            .body(ByteStream::from(object.body))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: object.key.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(key = %object.key, size, bucket = %self.config.bucket, "Object stored");
        Ok(self.config.object_url(&object.key))
    }
}
