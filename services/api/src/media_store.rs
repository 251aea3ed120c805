//! Media store adapter wrapping the S3-compatible media host
//!
//! Uploads take a local temporary file, push it to the bucket, and remove
//! the local file whether or not the upload succeeded. Deletions are best
//! effort: a failed delete is logged and never fails the calling request.

use anyhow::Result;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Kind of asset held by the media host; selects the key prefix the object
/// lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Video,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "avi", "m4v"];

impl ResourceKind {
    /// Key prefix for objects of this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::Image => "images",
            ResourceKind::Video => "videos",
        }
    }

    /// Detect the kind from a file extension; anything that is not a known
    /// video container is treated as an image
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => ResourceKind::Video,
            _ => ResourceKind::Image,
        }
    }
}

/// Handle returned by a successful upload
#[derive(Debug, Clone)]
pub struct MediaAsset {
    /// Public URL of the uploaded object
    pub url: String,
    /// Stable identifier usable for later deletion
    pub storage_id: String,
}

/// Media store configuration
#[derive(Debug, Clone)]
pub struct MediaStoreConfig {
    /// Bucket holding uploaded media
    pub bucket: String,
    /// Public URL prefix under which bucket objects are served
    pub public_base_url: String,
    /// Directory where incoming multipart files are staged before upload
    pub temp_dir: PathBuf,
}

impl MediaStoreConfig {
    /// Create a new MediaStoreConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MEDIA_BUCKET_NAME`: Bucket name (default: "vidtube-media")
    /// - `MEDIA_PUBLIC_BASE_URL`: Public URL prefix (default: the bucket's
    ///   S3 website URL)
    /// - `TEMP_UPLOAD_DIR`: Staging directory for incoming files
    pub fn from_env() -> Self {
        let bucket =
            std::env::var("MEDIA_BUCKET_NAME").unwrap_or_else(|_| "vidtube-media".to_string());

        let public_base_url = std::env::var("MEDIA_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.amazonaws.com", bucket));

        let temp_dir = std::env::var("TEMP_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("vidtube-uploads"));

        MediaStoreConfig {
            bucket,
            public_base_url,
            temp_dir,
        }
    }
}

/// Media store adapter
#[derive(Clone)]
pub struct MediaStore {
    client: Client,
    config: MediaStoreConfig,
}

impl MediaStore {
    /// Initialize the adapter with AWS credentials from the environment
    pub async fn new(config: MediaStoreConfig) -> Self {
        let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = Client::new(&aws_config);

        MediaStore { client, config }
    }

    /// Staging directory for incoming multipart files
    pub fn temp_dir(&self) -> &Path {
        &self.config.temp_dir
    }

    /// Upload a local file to the media host
    ///
    /// The local file is removed on success and on failure alike; only the
    /// remote object survives this call.
    pub async fn upload(&self, local_path: &Path) -> Result<MediaAsset> {
        let result = self.put_object(local_path).await;

        if let Err(e) = tokio::fs::remove_file(local_path).await {
            warn!("Failed to remove temporary file {:?}: {}", local_path, e);
        }

        result
    }

    async fn put_object(&self, local_path: &Path) -> Result<MediaAsset> {
        let bytes = tokio::fs::read(local_path).await?;

        let kind = ResourceKind::from_path(local_path);
        let extension = local_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_ascii_lowercase();
        let storage_id = Uuid::new_v4().simple().to_string();
        let key = format!("{}/{}.{}", kind.prefix(), storage_id, extension);

        let content_type = mime_guess::from_path(local_path)
            .first_or_octet_stream()
            .to_string();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        let url = format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        );

        info!("Uploaded {:?} to media host as {}", local_path, key);

        Ok(MediaAsset { url, storage_id })
    }

    /// Best-effort deletion of a previously uploaded asset
    ///
    /// The extension is not part of the storage id, so the object is found
    /// by listing the `<prefix>/<storage_id>.` keys first. Failures are
    /// logged and swallowed.
    pub async fn delete(&self, storage_id: &str, kind: ResourceKind) {
        match self.delete_object(storage_id, kind).await {
            Ok(true) => info!("Deleted media asset {}", storage_id),
            Ok(false) => warn!("No media asset found for id {}", storage_id),
            Err(e) => warn!("Failed to delete media asset {}: {}", storage_id, e),
        }
    }

    async fn delete_object(&self, storage_id: &str, kind: ResourceKind) -> Result<bool> {
        let prefix = format!("{}/{}.", kind.prefix(), storage_id);

        let listing = self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .prefix(&prefix)
            .send()
            .await?;

        let Some(key) = listing
            .contents
            .unwrap_or_default()
            .into_iter()
            .find_map(|obj| obj.key)
        else {
            return Ok(false);
        };

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await?;

        Ok(true)
    }
}

/// Extract the storage identifier from a stored asset URL: the segment
/// between the last `/` and the last `.` of the final path segment
pub fn storage_id_from_url(url: &str) -> Option<&str> {
    let segment = url.rsplit('/').next()?;
    let dot = segment.rfind('.')?;
    let stem = &segment[..dot];

    (!stem.is_empty()).then_some(stem)
}

/// Persist the bytes of an incoming multipart file part to the staging
/// directory, keeping the original name for extension detection
pub async fn persist_temp_file(dir: &Path, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    // keep only the final path component of a client-supplied name
    let file_name = Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin");

    let path = dir.join(format!("{}_{}", Uuid::new_v4().simple(), file_name));
    tokio::fs::write(&path, bytes).await?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_storage_id_from_url() {
        assert_eq!(
            storage_id_from_url("https://cdn.example.com/images/a1b2c3.png"),
            Some("a1b2c3")
        );
        assert_eq!(
            storage_id_from_url("https://cdn.example.com/videos/clip.v2.mp4"),
            Some("clip.v2")
        );
    }

    #[test]
    fn test_storage_id_extraction_failures() {
        // no dot in the final segment
        assert_eq!(storage_id_from_url("https://cdn.example.com/images/a1b2c3"), None);
        // empty stem
        assert_eq!(storage_id_from_url("https://cdn.example.com/images/.png"), None);
        assert_eq!(storage_id_from_url(""), None);
    }

    #[test]
    fn test_resource_kind_from_path() {
        assert_eq!(
            ResourceKind::from_path(Path::new("/tmp/a.MP4")),
            ResourceKind::Video
        );
        assert_eq!(
            ResourceKind::from_path(Path::new("/tmp/a.webm")),
            ResourceKind::Video
        );
        assert_eq!(
            ResourceKind::from_path(Path::new("/tmp/a.png")),
            ResourceKind::Image
        );
        assert_eq!(
            ResourceKind::from_path(Path::new("/tmp/noext")),
            ResourceKind::Image
        );
    }

    #[tokio::test]
    async fn test_persist_temp_file() {
        let dir = std::env::temp_dir().join("vidtube-test-uploads");
        let path = persist_temp_file(&dir, "avatar.png", b"png-bytes")
            .await
            .expect("persist failed");

        assert!(path.starts_with(&dir));
        assert!(path.to_string_lossy().ends_with("avatar.png"));
        let contents = tokio::fs::read(&path).await.expect("read failed");
        assert_eq!(contents, b"png-bytes");

        tokio::fs::remove_file(&path).await.expect("cleanup failed");
    }

    #[tokio::test]
    async fn test_persist_temp_file_strips_directories() {
        let dir = std::env::temp_dir().join("vidtube-test-uploads");
        let path = persist_temp_file(&dir, "../../etc/passwd.png", b"x")
            .await
            .expect("persist failed");

        assert!(path.starts_with(&dir));
        tokio::fs::remove_file(&path).await.expect("cleanup failed");
    }

    #[test]
    #[serial]
    fn test_media_store_config_defaults() {
        // run without the media env vars set
        unsafe {
            std::env::remove_var("MEDIA_BUCKET_NAME");
            std::env::remove_var("MEDIA_PUBLIC_BASE_URL");
            std::env::remove_var("TEMP_UPLOAD_DIR");
        }

        let config = MediaStoreConfig::from_env();
        assert_eq!(config.bucket, "vidtube-media");
        assert_eq!(
            config.public_base_url,
            "https://vidtube-media.s3.amazonaws.com"
        );
    }
}
