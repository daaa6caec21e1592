//! Idempotent website bucket setup.

use std::sync::Arc;

use s3web_core::{validate_bucket_name, BucketConfig, LogLevel, S3webError, SiteSettings};
use s3web_storage::{BucketCreation, ObjectStorage, StorageError};

/// Ensures a bucket exists and carries the website policy and configuration.
#[derive(Clone)]
pub struct BucketConfigurator {
    storage: Arc<dyn ObjectStorage>,
}

impl BucketConfigurator {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Create `name` if needed, then (re)apply its policy and website settings.
    ///
    /// Safe to repeat: an existing bucket owned by the caller converges to the
    /// same configuration. A bucket owned by someone else is a
    /// `BucketCreation` error and is not retried.
    pub async fn ensure_bucket(
        &self,
        name: &str,
        settings: &SiteSettings,
    ) -> Result<BucketConfig, S3webError> {
        validate_bucket_name(name)?;
        let config = BucketConfig::resolve(name, settings);

        match self.storage.create_bucket(name).await {
            Ok(BucketCreation::Created) => {
                tracing::info!(bucket = %name, "Bucket created");
            }
            Ok(BucketCreation::AlreadyOwned) => {
                tracing::info!(bucket = %name, "Bucket already exists, reapplying configuration");
            }
            Err(e) => {
                let reason = match e {
                    StorageError::BucketConflict(_) => {
                        "bucket name is already taken by another account".to_string()
                    }
                    other => other.to_string(),
                };
                return Err(log_error(S3webError::BucketCreation {
                    bucket: name.to_string(),
                    reason,
                }));
            }
        }

        self.storage
            .put_bucket_policy(name, &config.policy_document)
            .await
            .map_err(|e| configuration_error(name, e))?;

        self.storage
            .put_bucket_website(name, &config.index_document, &config.error_document)
            .await
            .map_err(|e| configuration_error(name, e))?;

        tracing::info!(
            bucket = %name,
            index_document = %config.index_document,
            error_document = %config.error_document,
            "Bucket configured for static website hosting"
        );

        Ok(config)
    }
}

fn configuration_error(bucket: &str, err: StorageError) -> S3webError {
    log_error(S3webError::Configuration {
        bucket: bucket.to_string(),
        reason: err.to_string(),
    })
}

fn log_error(err: S3webError) -> S3webError {
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error = %err, code, "Bucket setup failed"),
        LogLevel::Warn => tracing::warn!(error = %err, code, "Bucket setup failed"),
        LogLevel::Error => tracing::error!(error = %err, code, "Bucket setup failed"),
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3web_storage::LocalStorage;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_and_configures_bucket() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let configurator = BucketConfigurator::new(Arc::new(storage.clone()));

        let config = configurator
            .ensure_bucket("my-site", &SiteSettings::default())
            .await
            .unwrap();

        assert_eq!(config.name, "my-site");
        assert_eq!(
            storage.bucket_policy("my-site").await.unwrap(),
            Some(BucketConfig::public_read_policy("my-site"))
        );
        assert_eq!(
            storage.bucket_website("my-site").await.unwrap(),
            Some(("index.html".to_string(), "error.html".to_string()))
        );
    }

    #[tokio::test]
    async fn repeated_calls_converge() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let configurator = BucketConfigurator::new(Arc::new(storage.clone()));

        configurator
            .ensure_bucket("my-site", &SiteSettings::default())
            .await
            .unwrap();
        let second = configurator
            .ensure_bucket("my-site", &SiteSettings::new("home.html", "404.html"))
            .await
            .unwrap();

        assert_eq!(second.index_document, "home.html");
        assert_eq!(
            storage.bucket_website("my-site").await.unwrap(),
            Some(("home.html".to_string(), "404.html".to_string()))
        );
    }

    #[tokio::test]
    async fn foreign_bucket_is_a_creation_error() {
        let dir = tempdir().unwrap();
        let owner = LocalStorage::new(dir.path()).await.unwrap().with_owner("alice");
        owner.create_bucket("taken-site").await.unwrap();

        let other = LocalStorage::new(dir.path()).await.unwrap().with_owner("bob");
        let configurator = BucketConfigurator::new(Arc::new(other));

        let result = configurator
            .ensure_bucket("taken-site", &SiteSettings::default())
            .await;
        assert!(matches!(result, Err(S3webError::BucketCreation { .. })));
        // Nothing was applied to the foreign bucket.
        assert_eq!(owner.bucket_policy("taken-site").await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_name_is_rejected_before_any_call() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let configurator = BucketConfigurator::new(Arc::new(storage.clone()));

        let result = configurator
            .ensure_bucket("Not_Valid", &SiteSettings::default())
            .await;
        assert!(matches!(result, Err(S3webError::BucketCreation { .. })));
        assert!(storage.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_policy_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let configurator = BucketConfigurator::new(Arc::new(storage));

        let settings = SiteSettings::default().with_policy("not a policy");
        let result = configurator.ensure_bucket("my-site", &settings).await;
        assert!(matches!(result, Err(S3webError::Configuration { .. })));
    }

    #[tokio::test]
    async fn rejected_website_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let configurator = BucketConfigurator::new(Arc::new(storage));

        let settings = SiteSettings::new("pages/index.html", "error.html");
        let result = configurator.ensure_bucket("my-site", &settings).await;
        assert!(matches!(result, Err(S3webError::Configuration { .. })));
    }
}
