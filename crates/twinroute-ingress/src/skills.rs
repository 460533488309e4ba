//! Skill injection
//!
//! A skill is a `SKILL.md` file somewhere under a configured directory. Each
//! one becomes a synthetic `user` message placed right after the last
//! `system` message of every request.

use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use twinroute_core::openai::{ChatMessage, Role};
use walkdir::WalkDir;

const SKILL_FILE_NAME: &str = "SKILL.md";

/// Skill texts loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct SkillSet {
    skills: Vec<String>,
}

impl SkillSet {
    pub fn new(skills: Vec<String>) -> Self {
        Self { skills }
    }

    /// Collect every `SKILL.md` under `dirs`, in sorted path order.
    ///
    /// Missing directories and unreadable files are skipped with a warning;
    /// files that are empty after trimming contribute nothing.
    pub fn load(dirs: &[PathBuf]) -> Self {
        let mut skills = Vec::new();

        for dir in dirs {
            if !dir.is_dir() {
                warn!("Skill directory {} not found, skipping", dir.display());
                continue;
            }

            let mut files: Vec<PathBuf> = WalkDir::new(dir)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Failed to walk skill directory {}: {}", dir.display(), e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && entry.file_name() == SKILL_FILE_NAME)
                .map(|entry| entry.into_path())
                .collect();
            files.sort();

            for path in files {
                if let Some(skill) = read_skill(&path) {
                    skills.push(skill);
                }
            }
        }

        info!("Loaded {} skill(s)", skills.len());
        Self { skills }
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Insert one `user` message per skill after the last `system` message
    /// (at the front when there is none), preserving skill order.
    pub fn inject(&self, messages: &mut Vec<ChatMessage>) {
        if self.skills.is_empty() {
            return;
        }

        let at = messages
            .iter()
            .rposition(|m| m.role == Role::System)
            .map_or(0, |i| i + 1);

        messages.splice(at..at, self.skills.iter().map(ChatMessage::user));
    }

    /// Same injection on a raw Anthropic body, whose system prompt lives
    /// outside `messages`: the skills lead the message list.
    pub fn inject_anthropic(&self, body: &mut Value) {
        if self.skills.is_empty() {
            return;
        }
        let Some(messages) = body.get_mut("messages").and_then(Value::as_array_mut) else {
            return;
        };
        messages.splice(
            0..0,
            self.skills
                .iter()
                .map(|skill| json!({"role": "user", "content": skill})),
        );
    }
}

fn read_skill(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let content = content.trim();
            if content.is_empty() {
                debug!("Skipping empty skill file {}", path.display());
                None
            } else {
                Some(content.to_string())
            }
        }
        Err(e) => {
            warn!("Failed to read skill file {}: {}", path.display(), e);
            None
        }
    }
}
