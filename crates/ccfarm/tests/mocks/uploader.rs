use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use ccfarm::media::{UploadError, VideoMetadata, VideoUploader};

#[derive(Clone, Default)]
pub struct MockUploader {
    pub calls: Arc<Mutex<Vec<(PathBuf, VideoMetadata)>>>,
    pub fail_with: Option<String>,
}

impl MockUploader {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl VideoUploader for MockUploader {
    async fn upload(&self, path: &Path, metadata: &VideoMetadata) -> Result<String, UploadError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), metadata.clone()));
        if let Some(ref msg) = self.fail_with {
            return Err(UploadError::Api {
                status: 403,
                message: msg.clone(),
            });
        }
        Ok("https://youtu.be/mock123".into())
    }
}
