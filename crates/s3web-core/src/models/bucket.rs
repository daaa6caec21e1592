use serde::{Deserialize, Serialize};

use crate::error::S3webError;

/// Regions whose website endpoint uses the legacy `s3-website-{region}` form.
const DASH_WEBSITE_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "eu-west-1",
    "sa-east-1",
];

/// Caller-supplied website settings for `ensure_bucket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub index_document: String,
    pub error_document: String,
    /// Policy to apply instead of the default public-read policy.
    #[serde(default)]
    pub policy_document: Option<String>,
}

impl SiteSettings {
    pub fn new(index_document: impl Into<String>, error_document: impl Into<String>) -> Self {
        Self {
            index_document: index_document.into(),
            error_document: error_document.into(),
            policy_document: None,
        }
    }

    pub fn with_policy(mut self, policy_document: impl Into<String>) -> Self {
        self.policy_document = Some(policy_document.into());
        self
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self::new("index.html", "error.html")
    }
}

/// Configuration applied to a website bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    pub policy_document: String,
    pub index_document: String,
    pub error_document: String,
}

impl BucketConfig {
    /// Resolve the settings for `name`, falling back to the public-read policy.
    pub fn resolve(name: &str, settings: &SiteSettings) -> Self {
        Self {
            name: name.to_string(),
            policy_document: settings
                .policy_document
                .clone()
                .unwrap_or_else(|| Self::public_read_policy(name)),
            index_document: settings.index_document.clone(),
            error_document: settings.error_document.clone(),
        }
    }

    /// Policy granting anonymous `s3:GetObject` on every object in the bucket.
    pub fn public_read_policy(name: &str) -> String {
        serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "PublicReadGetObject",
                "Effect": "Allow",
                "Principal": "*",
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{}/*", name)]
            }]
        })
        .to_string()
    }

    /// Static website endpoint for this bucket in `region`.
    pub fn website_url(&self, region: &str) -> String {
        if DASH_WEBSITE_REGIONS.contains(&region) {
            format!("http://{}.s3-website-{}.amazonaws.com", self.name, region)
        } else {
            format!("http://{}.s3-website.{}.amazonaws.com", self.name, region)
        }
    }
}

/// Check a bucket name against the provider's naming rules.
pub fn validate_bucket_name(name: &str) -> Result<(), S3webError> {
    let reject = |reason: &str| {
        Err(S3webError::BucketCreation {
            bucket: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.len() < 3 || name.len() > 63 {
        return reject("bucket names must be between 3 and 63 characters long");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return reject("bucket names may only contain lowercase letters, digits, '-' and '.'");
    }
    let starts_ok = name.starts_with(|c: char| c.is_ascii_alphanumeric());
    let ends_ok = name.ends_with(|c: char| c.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return reject("bucket names must begin and end with a letter or digit");
    }
    if name.contains("..") {
        return reject("bucket names must not contain two adjacent periods");
    }
    Ok(())
}
