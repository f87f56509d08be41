// SPDX-License-Identifier: Apache-2.0

use crate::image::sniff_image;
use serde::Serialize;
use std::collections::BTreeMap;

/// Field-level validation failures, keyed by form field name. An empty map
/// means the input is acceptable; a non-empty map redisplays the form and
/// nothing is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

/// An uploaded file as received from the post form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Raw post-form input before validation. The group reference is checked
/// against the store by the handler; everything else validates here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group: Option<i64>,
    pub upload: Option<PostUpload>,
}

impl PostDraft {
    /// Returns the field errors for this draft. Text must be non-blank and
    /// any uploaded payload must sniff as a supported image format.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.text.trim().is_empty() {
            errors.add("text", "This field is required.");
        }
        if let Some(upload) = &self.upload {
            if sniff_image(&upload.bytes).is_none() {
                errors.add("image", "Upload a valid image.");
            }
        }
        errors
    }

    #[must_use]
    pub fn trimmed_text(&self) -> String {
        self.text.trim().to_string()
    }
}

/// Raw comment-form input. Invalid comments are dropped silently and the
/// requester is redirected back to the post detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentDraft {
    pub text: String,
}

impl CommentDraft {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.text.trim().is_empty()
    }

    #[must_use]
    pub fn trimmed_text(&self) -> String {
        self.text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_a_field_error() {
        let draft = PostDraft {
            text: "   ".to_string(),
            ..PostDraft::default()
        };
        let errors = draft.validate();
        assert_eq!(errors.get("text"), Some("This field is required."));
    }

    #[test]
    fn non_image_upload_is_a_field_error() {
        let draft = PostDraft {
            text: "hello".to_string(),
            group: None,
            upload: Some(PostUpload {
                filename: "sheet.xlsx".to_string(),
                bytes: b"PK\x03\x04".to_vec(),
            }),
        };
        let errors = draft.validate();
        assert!(errors.get("text").is_none());
        assert_eq!(errors.get("image"), Some("Upload a valid image."));
    }

    #[test]
    fn valid_draft_has_no_errors() {
        let draft = PostDraft {
            text: " hello world ".to_string(),
            group: Some(1),
            upload: Some(PostUpload {
                filename: "pic.png".to_string(),
                bytes: vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00],
            }),
        };
        assert!(draft.validate().is_empty());
        assert_eq!(draft.trimmed_text(), "hello world");
    }

    #[test]
    fn blank_comment_is_invalid() {
        assert!(!CommentDraft { text: "  ".into() }.is_valid());
        assert!(CommentDraft { text: "nice".into() }.is_valid());
    }
}
