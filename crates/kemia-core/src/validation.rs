//! The validation gate: pure accept/reject decisions for candidate files.
//!
//! No side effects; user-visible messaging is the caller's responsibility.
//! Candidates are evaluated in selection order, so when a batch overflows
//! capacity the first N slots are accepted and the remainder rejected.

use crate::error::ValidationError;
use crate::models::CandidateFile;

const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MIN_FILE_SIZE_BYTES: u64 = 1;
const DEFAULT_CAPACITY: usize = 10;

/// Policy for one upload surface: allowed media kinds, byte-size bounds, and
/// the concurrent item capacity of a session.
#[derive(Clone, Debug)]
pub struct UploadPolicy {
    pub allowed_content_types: Vec<String>,
    /// Extension allowlist; empty means any extension (content type still applies).
    pub allowed_extensions: Vec<String>,
    pub min_file_size_bytes: u64,
    pub max_file_size_bytes: u64,
    pub capacity: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
            allowed_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "webp".to_string(),
            ],
            min_file_size_bytes: DEFAULT_MIN_FILE_SIZE_BYTES,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// A candidate the gate turned away, with the payload dropped.
#[derive(Debug)]
pub struct RejectedCandidate {
    pub file_name: String,
    pub error: ValidationError,
}

impl UploadPolicy {
    /// Check a single candidate against this policy. `current_count` is the
    /// number of items already occupying session slots.
    pub fn check(
        &self,
        candidate: &CandidateFile,
        current_count: usize,
    ) -> Result<(), ValidationError> {
        let content_type = candidate.content_type.to_lowercase();
        if !self.allowed_content_types.iter().any(|ct| ct == &content_type) {
            return Err(ValidationError::UnsupportedType {
                content_type: candidate.content_type.clone(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        if !self.allowed_extensions.is_empty() {
            let matches = candidate
                .extension()
                .map(|ext| self.allowed_extensions.contains(&ext))
                .unwrap_or(false);
            if !matches {
                return Err(ValidationError::UnsupportedType {
                    content_type: candidate.content_type.clone(),
                    allowed: self.allowed_content_types.clone(),
                });
            }
        }

        let size = candidate.size();
        if size > self.max_file_size_bytes {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_file_size_bytes,
            });
        }

        // Guards against zero-byte/corrupt selections.
        if size < self.min_file_size_bytes {
            return Err(ValidationError::TooSmall {
                size,
                min: self.min_file_size_bytes,
            });
        }

        if current_count + 1 > self.capacity {
            return Err(ValidationError::CapacityExceeded {
                count: current_count + 1,
                capacity: self.capacity,
            });
        }

        Ok(())
    }

    /// Split candidates into accepted and rejected, in selection order. The
    /// capacity check is incremental: each acceptance takes a slot, so the
    /// first slots up to capacity win, never an arbitrary subset.
    pub fn partition(
        &self,
        candidates: Vec<CandidateFile>,
        current_count: usize,
    ) -> (Vec<CandidateFile>, Vec<RejectedCandidate>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        let mut count = current_count;

        for candidate in candidates {
            match self.check(&candidate, count) {
                Ok(()) => {
                    count += 1;
                    accepted.push(candidate);
                }
                Err(error) => {
                    tracing::debug!(
                        file_name = %candidate.file_name,
                        %error,
                        "candidate rejected by validation gate"
                    );
                    rejected.push(RejectedCandidate {
                        file_name: candidate.file_name,
                        error,
                    });
                }
            }
        }

        (accepted, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_policy() -> UploadPolicy {
        UploadPolicy {
            allowed_content_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
            allowed_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            min_file_size_bytes: 1,
            max_file_size_bytes: 1024,
            capacity: 5,
        }
    }

    fn candidate(name: &str, content_type: &str, size: usize) -> CandidateFile {
        CandidateFile::new(name, content_type, vec![0u8; size])
    }

    #[test]
    fn test_accepts_valid_candidate() {
        let policy = test_policy();
        assert!(policy.check(&candidate("a.png", "image/png", 512), 0).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_content_type() {
        let policy = test_policy();
        let err = policy
            .check(&candidate("a.gif", "image/gif", 512), 0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        let policy = test_policy();
        let err = policy
            .check(&candidate("a.bmp", "image/png", 512), 0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn test_content_type_is_case_insensitive() {
        let policy = test_policy();
        assert!(policy
            .check(&candidate("a.png", "IMAGE/PNG", 512), 0)
            .is_ok());
    }

    #[test]
    fn test_rejects_too_large() {
        let policy = test_policy();
        let err = policy
            .check(&candidate("a.png", "image/png", 2048), 0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
    }

    #[test]
    fn test_rejects_zero_byte_file() {
        let policy = test_policy();
        let err = policy
            .check(&candidate("a.png", "image/png", 0), 0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooSmall { .. }));
    }

    #[test]
    fn test_rejects_over_capacity() {
        let policy = test_policy();
        let err = policy
            .check(&candidate("a.png", "image/png", 512), 5)
            .unwrap_err();
        assert!(matches!(err, ValidationError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_partition_preserves_selection_order() {
        let policy = test_policy();
        let candidates = vec![
            candidate("1.png", "image/png", 10),
            candidate("2.gif", "image/gif", 10),
            candidate("3.png", "image/png", 10),
        ];
        let (accepted, rejected) = policy.partition(candidates, 0);

        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].file_name, "1.png");
        assert_eq!(accepted[1].file_name, "3.png");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].file_name, "2.gif");
    }

    #[test]
    fn test_partition_capacity_takes_first_slots() {
        let policy = test_policy();
        let candidates: Vec<CandidateFile> = (0..6)
            .map(|i| candidate(&format!("{}.png", i), "image/png", 10))
            .collect();
        let (accepted, rejected) = policy.partition(candidates, 0);

        assert_eq!(accepted.len(), 5);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].file_name, "5.png");
        assert!(matches!(
            rejected[0].error,
            ValidationError::CapacityExceeded { .. }
        ));
    }

    #[test]
    fn test_partition_accounts_for_existing_items() {
        let policy = test_policy();
        let candidates: Vec<CandidateFile> = (0..3)
            .map(|i| candidate(&format!("{}.png", i), "image/png", 10))
            .collect();
        let (accepted, rejected) = policy.partition(candidates, 4);

        assert_eq!(accepted.len(), 1);
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn test_partition_is_exhaustive() {
        let policy = test_policy();
        let candidates = vec![
            candidate("a.png", "image/png", 10),
            candidate("b.gif", "image/gif", 10),
            candidate("c.png", "image/png", 0),
        ];
        let total = candidates.len();
        let (accepted, rejected) = policy.partition(candidates, 0);
        assert_eq!(accepted.len() + rejected.len(), total);
    }

    #[test]
    fn test_rejected_candidate_in_mixed_batch_does_not_consume_slot() {
        let mut policy = test_policy();
        policy.capacity = 2;
        let candidates = vec![
            candidate("a.png", "image/png", 10),
            candidate("b.gif", "image/gif", 10),
            candidate("c.png", "image/png", 10),
        ];
        let (accepted, rejected) = policy.partition(candidates, 0);
        assert_eq!(accepted.len(), 2);
        assert_eq!(rejected.len(), 1);
    }
}
