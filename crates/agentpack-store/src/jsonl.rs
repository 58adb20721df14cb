// ABOUTME: Append-only JSONL log of processed agent descriptors.
// ABOUTME: Reruns read the whole log, skip malformed lines, and append new records without rewriting old ones.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use agentpack_core::AgentDescriptor;
use thiserror::Error;

/// Errors that can occur during descriptor log operations.
#[derive(Debug, Error)]
pub enum JsonlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of reading a descriptor log from disk.
#[derive(Debug, Default)]
pub struct Replay {
    pub descriptors: Vec<AgentDescriptor>,
    /// Non-empty lines that did not parse as a descriptor.
    pub skipped: usize,
}

/// An append-only JSONL descriptor log backed by a file.
/// Each line is a single JSON-serialized AgentDescriptor followed by a newline.
pub struct DescriptorLog {
    path: PathBuf,
    file: File,
}

impl DescriptorLog {
    /// Returns the path to the underlying JSONL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (or create) a descriptor log at the given path, in append mode.
    /// Creates parent directories if they do not exist. A torn final line
    /// is terminated so the next append starts on a fresh line.
    pub fn open(path: &Path) -> Result<Self, JsonlError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        if ends_without_newline(&mut file)? {
            writeln!(file)?;
            file.sync_all()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append one descriptor as a single JSON line and fsync.
    pub fn append(&mut self, descriptor: &AgentDescriptor) -> Result<(), JsonlError> {
        let json = serde_json::to_string(descriptor)?;
        writeln!(self.file, "{}", json)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Read every descriptor in the log, in order. Empty lines are ignored and
    /// malformed lines are skipped with a warning. A missing file is an empty log.
    pub fn replay(path: &Path) -> Result<Replay, JsonlError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(file);
        let mut replay = Replay::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AgentDescriptor>(&line) {
                Ok(descriptor) => replay.descriptors.push(descriptor),
                Err(e) => {
                    tracing::warn!(
                        "skipping malformed descriptor at {}:{}: {}",
                        path.display(),
                        line_no + 1,
                        e
                    );
                    replay.skipped += 1;
                }
            }
        }

        Ok(replay)
    }

    /// Merge a batch into the log: read the recorded history, append the new
    /// descriptors, and return history followed by the batch. Previously
    /// recorded lines are never rewritten.
    pub fn merge(
        path: &Path,
        batch: &[AgentDescriptor],
    ) -> Result<Vec<AgentDescriptor>, JsonlError> {
        let Replay {
            mut descriptors,
            skipped,
        } = Self::replay(path)?;
        let recorded = descriptors.len();

        let mut log = Self::open(path)?;
        for descriptor in batch {
            log.append(descriptor)?;
            descriptors.push(descriptor.clone());
        }

        tracing::info!(
            "descriptor log {}: {} recorded, {} appended, {} malformed skipped",
            path.display(),
            recorded,
            batch.len(),
            skipped
        );
        Ok(descriptors)
    }
}

fn ends_without_newline(file: &mut File) -> Result<bool, std::io::Error> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentpack_core::ParameterSpec;
    use tempfile::TempDir;

    fn make_descriptor(id: &str) -> AgentDescriptor {
        AgentDescriptor {
            id: id.to_string(),
            title: format!("Agent {}", id),
            description: "Test agent".to_string(),
            inputs: vec![ParameterSpec {
                name: "query".to_string(),
                description: "Query".to_string(),
                required: true,
                declared_type: "text".to_string(),
            }],
            outputs: vec![],
            api_key: Some("key".to_string()),
            flow_id: None,
            endpoint: None,
        }
    }

    #[test]
    fn append_and_replay_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agents.jsonl");

        let mut log = DescriptorLog::open(&path).unwrap();
        log.append(&make_descriptor("a")).unwrap();
        log.append(&make_descriptor("b")).unwrap();

        let replay = DescriptorLog::replay(&path).unwrap();
        assert_eq!(replay.descriptors.len(), 2);
        assert_eq!(replay.descriptors[0].id, "a");
        assert_eq!(replay.descriptors[1].id, "b");
        assert_eq!(replay.skipped, 0);
    }

    #[test]
    fn replay_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let replay = DescriptorLog::replay(&dir.path().join("none.jsonl")).unwrap();
        assert!(replay.descriptors.is_empty());
    }

    #[test]
    fn replay_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.jsonl");

        let good = serde_json::to_string(&make_descriptor("ok")).unwrap();
        fs::write(&path, format!("{}\nnot json\n\n{{\"agentId\": 3}}\n{}\n", good, good)).unwrap();

        let replay = DescriptorLog::replay(&path).unwrap();
        assert_eq!(replay.descriptors.len(), 2);
        assert_eq!(replay.skipped, 2);
    }

    #[test]
    fn merge_grows_by_batch_and_keeps_prior_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history").join("agents.jsonl");

        let first =
            DescriptorLog::merge(&path, &[make_descriptor("a"), make_descriptor("b")]).unwrap();
        assert_eq!(first.len(), 2);
        let before = fs::read(&path).unwrap();

        let second = DescriptorLog::merge(&path, &[make_descriptor("c")]).unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second[2].id, "c");

        let after = fs::read(&path).unwrap();
        assert!(after.starts_with(&before), "prior entries must be byte-identical");
        let lines = String::from_utf8(after).unwrap();
        assert_eq!(lines.lines().count(), 3);
    }

    #[test]
    fn merge_with_empty_batch_only_reads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agents.jsonl");

        DescriptorLog::merge(&path, &[make_descriptor("a")]).unwrap();
        let all = DescriptorLog::merge(&path, &[]).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn open_terminates_torn_last_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("torn.jsonl");
        let good = serde_json::to_string(&make_descriptor("a")).unwrap();
        fs::write(&path, format!("{}\n{{\"agentId\":\"tr", good)).unwrap();

        let mut log = DescriptorLog::open(&path).unwrap();
        log.append(&make_descriptor("b")).unwrap();
        drop(log);

        let replay = DescriptorLog::replay(&path).unwrap();
        assert_eq!(replay.descriptors.len(), 2);
        assert_eq!(replay.descriptors[1].id, "b");
        assert_eq!(replay.skipped, 1);
    }
}
