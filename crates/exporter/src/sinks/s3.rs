use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::{
    aws::AmazonS3Builder, buffered::BufWriter, path::Path, Attribute, AttributeValue, Attributes,
    ObjectStore, PutOptions, PutPayload,
};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::{DocumentKey, Sink, JSON_CONTENT_TYPE};
use crate::config::ObjectStoreConfig;

/// Writes documents under `<prefix>/<cluster>/` in an object store bucket.
/// Objects are overwritten in place; no versioning is relied on.
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    base: String,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str, cluster_name: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        let base = if prefix.is_empty() {
            cluster_name.to_string()
        } else {
            format!("{}/{}", prefix, cluster_name)
        };
        Self { store, base }
    }

    /// S3 client using the standard AWS environment for credentials.
    pub fn from_config(
        config: &ObjectStoreConfig,
        prefix: &str,
        cluster_name: &str,
    ) -> crate::Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(&config.region)
            .with_bucket_name(&config.bucket);
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let store = builder.build()?;
        Ok(Self::new(Arc::new(store), prefix, cluster_name))
    }

    pub fn object_path(&self, key: &DocumentKey) -> Path {
        let relative = match key {
            DocumentKey::Report { file_name } => format!("{}.json", file_name),
            DocumentKey::Index => "index.json".to_string(),
            DocumentKey::Snapshot { timestamp } => format!("snapshots/{}/metadata.json", timestamp),
        };
        Path::from(format!("{}/{}", self.base, relative))
    }
}

fn json_attributes() -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(
        Attribute::ContentType,
        AttributeValue::from(JSON_CONTENT_TYPE),
    );
    attributes
}

#[async_trait]
impl Sink for ObjectStoreSink {
    fn name(&self) -> &str {
        "s3"
    }

    fn location(&self, key: &DocumentKey) -> String {
        self.object_path(key).to_string()
    }

    async fn write_file(&self, key: &DocumentKey, source: &FsPath) -> crate::Result<()> {
        let path = self.object_path(key);
        let mut file = tokio::fs::File::open(source).await?;
        let mut writer =
            BufWriter::new(self.store.clone(), path).with_attributes(json_attributes());

        if let Err(err) = tokio::io::copy(&mut file, &mut writer).await {
            if let Err(abort_err) = writer.abort().await {
                warn!(error = %abort_err, "Failed to abort partial upload");
            }
            return Err(err.into());
        }
        writer.shutdown().await?;
        Ok(())
    }

    async fn write_bytes(&self, key: &DocumentKey, bytes: Vec<u8>) -> crate::Result<()> {
        let options = PutOptions {
            attributes: json_attributes(),
            ..Default::default()
        };
        self.store
            .put_opts(&self.object_path(key), PutPayload::from(bytes), options)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use std::io::Write;

    fn sink(store: Arc<InMemory>) -> ObjectStoreSink {
        ObjectStoreSink::new(store, "vuln", "prod")
    }

    async fn read(store: &InMemory, key: &str) -> Vec<u8> {
        store
            .get(&Path::from(key))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_object_paths() {
        let sink = sink(Arc::new(InMemory::new()));
        assert_eq!(
            sink.location(&DocumentKey::Report {
                file_name: "config-audit-reports"
            }),
            "vuln/prod/config-audit-reports.json"
        );
        assert_eq!(sink.location(&DocumentKey::Index), "vuln/prod/index.json");
        assert_eq!(
            sink.location(&DocumentKey::Snapshot {
                timestamp: "20240101-120000".to_string()
            }),
            "vuln/prod/snapshots/20240101-120000/metadata.json"
        );
    }

    #[test]
    fn test_empty_prefix() {
        let sink = ObjectStoreSink::new(Arc::new(InMemory::new()), "", "prod");
        assert_eq!(sink.location(&DocumentKey::Index), "prod/index.json");
    }

    #[tokio::test]
    async fn test_write_file_overwrites_existing_object() {
        let store = Arc::new(InMemory::new());
        let sink = sink(store.clone());
        let key = DocumentKey::Report {
            file_name: "vulnerability-reports",
        };

        let mut first = tempfile::NamedTempFile::new().unwrap();
        first.write_all(b"{\"items\":[1,2,3]}").unwrap();
        sink.write_file(&key, first.path()).await.unwrap();

        let mut second = tempfile::NamedTempFile::new().unwrap();
        second.write_all(b"{\"items\":[]}").unwrap();
        sink.write_file(&key, second.path()).await.unwrap();

        let body = read(&store, "vuln/prod/vulnerability-reports.json").await;
        assert_eq!(body, b"{\"items\":[]}");
    }

    #[tokio::test]
    async fn test_write_bytes() {
        let store = Arc::new(InMemory::new());
        let sink = sink(store.clone());
        sink.write_bytes(&DocumentKey::Index, b"{\"cluster\":\"prod\"}".to_vec())
            .await
            .unwrap();
        assert_eq!(
            read(&store, "vuln/prod/index.json").await,
            b"{\"cluster\":\"prod\"}"
        );
    }

    #[tokio::test]
    async fn test_write_file_missing_source() {
        let sink = sink(Arc::new(InMemory::new()));
        let result = sink
            .write_file(&DocumentKey::Index, FsPath::new("/definitely/not/here.json"))
            .await;
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
