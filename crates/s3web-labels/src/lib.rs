//! s3web Labels Library
//!
//! Video label detection over objects already stored in a bucket: start an
//! asynchronous provider job, poll it with a growing delay, then collect
//! every page of labels.

pub mod api;
pub mod detector;
pub mod error;
#[cfg(feature = "rekognition")]
pub mod rekognition;

pub use api::{LabelDetectionApi, LabelDetectionPage};
pub use detector::{LabelDetector, PollSettings};
pub use error::{LabelError, LabelResult};
#[cfg(feature = "rekognition")]
pub use rekognition::RekognitionLabels;
