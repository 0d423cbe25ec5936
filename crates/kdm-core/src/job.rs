//! Download job descriptors and per-job outcomes.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Which part of a post the file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileType {
    #[default]
    #[serde(rename = "attachment")]
    Attachment,
    /// The post's single `file` (usually the cover image).
    #[serde(rename = "file")]
    PostFile,
}

/// Post metadata carried along for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostContext {
    pub id: Option<String>,
    pub title: Option<String>,
    pub service: Option<String>,
    pub user: Option<String>,
    pub published: Option<NaiveDateTime>,
}

/// One file to download. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Directory the file is saved into.
    pub path: PathBuf,
    /// Name to use when the server does not provide one.
    #[serde(default)]
    pub alt_filename: Option<String>,
    /// The `path` part of the download URL, e.g. `/data/5c/98/5c98...jpg`.
    pub server_path: String,
    #[serde(default, rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub post: PostContext,
}

impl Job {
    pub fn new(path: impl Into<PathBuf>, server_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alt_filename: None,
            server_path: server_path.into(),
            file_type: FileType::Attachment,
            post: PostContext::default(),
        }
    }

    pub fn with_alt_filename(mut self, name: impl Into<String>) -> Self {
        self.alt_filename = Some(name.into());
        self
    }

    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn with_post(mut self, post: PostContext) -> Self {
        self.post = post;
        self
    }

    /// Label for progress lines: the hint, else the last server path segment.
    pub fn label(&self) -> String {
        if let Some(name) = self.alt_filename.as_deref().filter(|s| !s.is_empty()) {
            return name.to_string();
        }
        self.server_path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(&self.server_path)
            .to_string()
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.file_type {
            FileType::Attachment => "attachment",
            FileType::PostFile => "file",
        };
        write!(f, "{} {}", kind, self.label())?;
        if let Some(id) = &self.post.id {
            write!(f, " (post {}", id)?;
            if let Some(service) = &self.post.service {
                write!(f, " on {}", service)?;
            }
            if let Some(user) = &self.post.user {
                write!(f, " by {}", user)?;
            }
            if let Some(title) = &self.post.title {
                write!(f, ": {}", title)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Parse a job manifest: a JSON array of jobs.
pub fn parse_manifest(data: &str) -> Result<Vec<Job>> {
    serde_json::from_str(data).context("manifest is not a JSON array of jobs")
}

/// Read and parse a job manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<Job>> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_manifest(&data).with_context(|| format!("parse {}", path.display()))
}

/// Why a job produced no new download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The destination file already exists.
    AlreadyExists,
    /// The file exists in the bucket and at the destination.
    ExistsInBucket,
    /// The file existed in the bucket and was hard-linked into place.
    LinkedFromBucket,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SkipReason::AlreadyExists => "download file already exists, skipping",
            SkipReason::ExistsInBucket => "download file already exists in both bucket and local, skipping",
            SkipReason::LinkedFromBucket => "download file already exists in bucket, linked to local path",
        };
        f.write_str(msg)
    }
}

/// Terminal result of processing one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Saved under this file name.
    Completed(String),
    Skipped(SkipReason),
    /// Error kind name and message.
    Failed(&'static str, String),
}

/// Lifecycle of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Waiting,
    Running,
    Completed,
    Skipped,
    Failed,
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Completed(_) => JobState::Completed,
            JobOutcome::Skipped(_) => JobState::Skipped,
            JobOutcome::Failed(..) => JobState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_job_deserializes() {
        let json = r#"{
            "path": "/downloads/creator/123",
            "alt_filename": "cover.png",
            "server_path": "/data/ab/cd/abcd.png",
            "type": "file",
            "post": {"id": "123", "title": "Hello", "service": "patreon", "user": "42",
                     "published": "2024-04-03T12:30:45"}
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.file_type, FileType::PostFile);
        assert_eq!(job.alt_filename.as_deref(), Some("cover.png"));
        assert_eq!(job.post.service.as_deref(), Some("patreon"));
        assert!(job.post.published.is_some());
    }

    #[test]
    fn minimal_job_defaults() {
        let job: Job = serde_json::from_str(r#"{"path": "out", "server_path": "/a/b.zip"}"#).unwrap();
        assert_eq!(job.file_type, FileType::Attachment);
        assert_eq!(job.post, PostContext::default());
        assert_eq!(job.label(), "b.zip");
    }

    #[test]
    fn manifest_is_an_array() {
        let jobs = parse_manifest(
            r#"[{"path": "a", "server_path": "/x/1.bin"}, {"path": "b", "server_path": "/x/2.bin"}]"#,
        )
        .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].path, PathBuf::from("b"));
        assert!(parse_manifest(r#"{"path": "a", "server_path": "/x"}"#).is_err());
        assert!(parse_manifest("[]").unwrap().is_empty());
    }

    #[test]
    fn display_includes_post_context() {
        let job = Job::new("out", "/x/y.jpg").with_post(PostContext {
            id: Some("7".into()),
            service: Some("fanbox".into()),
            ..Default::default()
        });
        assert_eq!(job.to_string(), "attachment y.jpg (post 7 on fanbox)");
    }

    #[test]
    fn outcome_states() {
        assert_eq!(JobOutcome::Completed("a".into()).state(), JobState::Completed);
        assert_eq!(JobOutcome::Skipped(SkipReason::AlreadyExists).state(), JobState::Skipped);
        assert_eq!(JobOutcome::Failed("HTTPStatusError", "HTTP 404".into()).state(), JobState::Failed);
    }
}
