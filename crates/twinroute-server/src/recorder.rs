//! JSONL prompt and response recording

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use twinroute_core::{
    Result,
    openai::{ChatMessage, ChatResponse},
    recorder::ExchangeRecorder,
};

/// One append-only JSONL file; the mutex keeps concurrent lines whole
struct JsonlFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn append<T: Serialize>(&self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;

        Ok(())
    }
}

#[derive(Serialize)]
struct PromptLine<'a> {
    messages: &'a [ChatMessage],
}

/// Appends one line per prompt (`{"messages":[...]}`) and one per completion
/// to separate files; either side may be disabled.
pub struct JsonlRecorder {
    prompts: Option<JsonlFile>,
    responses: Option<JsonlFile>,
}

impl JsonlRecorder {
    /// `None` when both files are disabled
    pub fn new(prompt_path: Option<PathBuf>, response_path: Option<PathBuf>) -> Option<Self> {
        if prompt_path.is_none() && response_path.is_none() {
            return None;
        }
        Some(Self {
            prompts: prompt_path.map(JsonlFile::new),
            responses: response_path.map(JsonlFile::new),
        })
    }

    pub fn prompt_path(&self) -> Option<&Path> {
        self.prompts.as_ref().map(|f| f.path.as_path())
    }

    pub fn response_path(&self) -> Option<&Path> {
        self.responses.as_ref().map(|f| f.path.as_path())
    }
}

#[async_trait]
impl ExchangeRecorder for JsonlRecorder {
    async fn record_prompt(&self, messages: &[ChatMessage]) -> Result<()> {
        match &self.prompts {
            Some(file) => file.append(&PromptLine { messages }).await,
            None => Ok(()),
        }
    }

    async fn record_response(&self, response: &ChatResponse) -> Result<()> {
        match &self.responses {
            Some(file) => file.append(response).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_disabled_when_no_paths() {
        assert!(JsonlRecorder::new(None, None).is_none());
    }

    #[tokio::test]
    async fn test_prompt_lines_are_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs/prompts.jsonl");
        let recorder = JsonlRecorder::new(Some(path.clone()), None).unwrap();

        recorder
            .record_prompt(&[ChatMessage::system("be brief"), ChatMessage::user("hi")])
            .await
            .unwrap();
        recorder
            .record_prompt(&[ChatMessage::user("again")])
            .await
            .unwrap();

        let lines = lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["messages"][0]["role"], "system");
        assert_eq!(lines[0]["messages"][1]["content"], "hi");
        assert_eq!(lines[1]["messages"][0]["content"], "again");
    }

    #[tokio::test]
    async fn test_response_goes_to_its_own_file() {
        let dir = tempdir().unwrap();
        let prompts = dir.path().join("prompts.jsonl");
        let responses = dir.path().join("responses.jsonl");
        let recorder = JsonlRecorder::new(Some(prompts.clone()), Some(responses.clone())).unwrap();

        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "m",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}]
        }))
        .unwrap();
        recorder.record_response(&response).await.unwrap();

        assert!(!prompts.exists());
        let lines = lines(&responses);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["id"], "chatcmpl-1");
        assert_eq!(lines[0]["choices"][0]["message"]["content"], "ok");
    }

    #[tokio::test]
    async fn test_disabled_side_is_a_no_op() {
        let dir = tempdir().unwrap();
        let responses = dir.path().join("responses.jsonl");
        let recorder = JsonlRecorder::new(None, Some(responses)).unwrap();

        recorder.record_prompt(&[ChatMessage::user("hi")]).await.unwrap();
        assert!(recorder.prompt_path().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writes_keep_lines_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prompts.jsonl");
        let recorder = Arc::new(JsonlRecorder::new(Some(path.clone()), None).unwrap());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let recorder = recorder.clone();
                tokio::spawn(async move {
                    recorder
                        .record_prompt(&[ChatMessage::user(format!("message {}", i))])
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(lines(&path).len(), 16);
    }
}
