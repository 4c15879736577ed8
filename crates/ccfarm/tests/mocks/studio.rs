use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use ccfarm::{media::Studio, types::VideoScript};

/// Writes a placeholder file instead of rendering
#[derive(Clone, Default)]
pub struct MockStudio {
    pub calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
    pub fail_with: Option<String>,
}

impl MockStudio {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl Studio for MockStudio {
    async fn render(&self, script: &VideoScript, output: &Path) -> anyhow::Result<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((script.title.clone(), output.to_path_buf()));
        if let Some(ref msg) = self.fail_with {
            anyhow::bail!("{}", msg);
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, b"not really a video").await?;
        Ok(output.to_path_buf())
    }
}
