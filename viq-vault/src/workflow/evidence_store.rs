//! Ordered evidence collection for one session

use bytes::Bytes;
use serde::Serialize;

use crate::models::{AttachedFile, CandidateFile, MimeClass};

/// Maximum accepted evidence file size (10 MiB, inclusive)
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Attached evidence files in insertion order
///
/// Every stored file has an accepted MIME class and is within
/// [`MAX_FILE_BYTES`]. Candidates that fail either check are dropped without
/// an error; callers compare the returned accepted list with their input if
/// they need to know.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct EvidenceStore {
    files: Vec<AttachedFile>,
}

impl EvidenceStore {
    /// Filter and append candidates, returning the files that were accepted
    pub fn add(&mut self, candidates: Vec<CandidateFile>) -> Vec<AttachedFile> {
        let accepted: Vec<AttachedFile> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let byte_size = candidate.content.len() as u64;
                let mime_class = MimeClass::classify(&candidate.mime_type);
                if !mime_class.is_accepted() || byte_size > MAX_FILE_BYTES {
                    tracing::debug!(
                        file = %candidate.display_name,
                        mime_type = %candidate.mime_type,
                        byte_size,
                        "Dropping evidence candidate"
                    );
                    return None;
                }
                Some(AttachedFile {
                    display_name: candidate.display_name,
                    byte_size,
                    mime_class,
                    mime_type: candidate.mime_type,
                    content: candidate.content,
                })
            })
            .collect();

        self.files.extend(accepted.iter().cloned());
        accepted
    }

    /// Remove the file at `index`; out-of-range indexes are ignored
    pub fn remove(&mut self, index: usize) -> Option<AttachedFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn files(&self) -> &[AttachedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Display names in stored order
    pub fn manifest(&self) -> Vec<String> {
        self.files.iter().map(|f| f.display_name.clone()).collect()
    }

    /// Drop raw file content, keeping names, sizes and MIME types
    pub fn release_content(&mut self) {
        for file in &mut self.files {
            file.content = Bytes::new();
        }
    }
}
