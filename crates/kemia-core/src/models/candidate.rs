//! Candidate file: a user selection before it has passed the validation gate.

use bytes::Bytes;

/// One file picked by the caller, carrying the payload and the metadata the
/// validation gate and the transport need. `Bytes` keeps clones cheap when a
/// batch is re-dispatched on retry.
#[derive(Clone, Debug)]
pub struct CandidateFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl CandidateFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}
