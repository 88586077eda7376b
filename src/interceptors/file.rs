use super::Interceptor;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes one markdown transcript per provider call into a directory.
#[derive(Debug)]
pub struct FileInterceptor {
    base_path: PathBuf,
}

impl FileInterceptor {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

fn file_safe(model: &str) -> String {
    model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[async_trait]
impl Interceptor for FileInterceptor {
    async fn save(&self, model: &str, prompt: &str, response: &str) -> std::io::Result<()> {
        let timestamp = Utc::now();
        let filename = format!(
            "quiz_{}_{}.md",
            timestamp.format("%Y%m%d_%H%M%S_%3f"),
            file_safe(model)
        );
        fs::create_dir_all(&self.base_path).await?;
        let file_path = self.base_path.join(filename);

        let content = format!("# Model\n\n{model}\n\n# Prompt\n\n{prompt}\n\n# Response\n\n{response}\n");

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_prompt_and_response() {
        let dir = std::env::temp_dir().join(format!("slide_quiz_transcripts_{}", std::process::id()));
        let interceptor = FileInterceptor::new(&dir);
        interceptor.save("gpt-5-nano", "Slides text:\nA", "{\"items\":[]}").await.unwrap();

        let mut entries = fs::read_dir(&dir).await.unwrap();
        let entry = entries.next_entry().await.unwrap().unwrap();
        let name = entry.file_name().into_string().unwrap();
        assert!(name.starts_with("quiz_") && name.ends_with("_gpt-5-nano.md"));
        let body = fs::read_to_string(entry.path()).await.unwrap();
        assert!(body.contains("# Prompt\n\nSlides text:\nA"));
        assert!(body.contains("# Response\n\n{\"items\":[]}"));
        let _ = fs::remove_dir_all(&dir).await;
    }
}
