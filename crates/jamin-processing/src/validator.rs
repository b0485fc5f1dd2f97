use crate::normalize::NormalizedFile;

/// Upload policy violations. All of them are client-correctable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max {max_mb} MB)")]
    FileTooLarge { size: usize, max_mb: usize },

    #[error("Invalid file type: {content_type}. Allowed types: {}", allowed.join(", "))]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Empty file")]
    EmptyFile,
}

/// Size and type checks applied to every layer upload
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    /// Size check, usable on a running byte count while a body is streamed.
    pub fn validate_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max_mb: self.max_file_size / 1024 / 1024,
            });
        }
        Ok(())
    }

    /// Compare the MIME essence (parameters stripped) against the allow-list.
    pub fn validate_content_type(&self, file: &NormalizedFile) -> Result<(), ValidationError> {
        let essence = file.essence();
        if !self.allowed_content_types.iter().any(|ct| *ct == essence) {
            return Err(ValidationError::InvalidContentType {
                content_type: file.content_type().to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }
        Ok(())
    }

    /// Size, then emptiness, then type.
    pub fn validate(&self, file: &NormalizedFile) -> Result<(), ValidationError> {
        self.validate_size(file.len())?;
        if file.is_empty() {
            return Err(ValidationError::EmptyFile);
        }
        self.validate_content_type(file)
    }
}
