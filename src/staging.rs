//! Upload staging area
//!
//! Holds images picked by the user but not yet sent. Every staged image owns
//! a preview handle issued by the [`PreviewRegistry`]; handles are revoked
//! before the entry referencing them is dropped.

use crate::conversation::ImageRef;
use crate::error::ValidationError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const PREVIEW_SCHEME: &str = "preview://";

/// A file chosen in the picker, before image filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub data: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.to_ascii_lowercase().starts_with("image/")
    }

    pub fn to_image_ref(&self) -> ImageRef {
        ImageRef {
            name: self.name.clone(),
            media_type: self.media_type.clone(),
            byte_len: self.data.len(),
        }
    }
}

/// Revocable handle to an in-memory preview
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.0
    }
}

/// Issues preview handles and keeps the bytes behind live ones
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: HashMap<PreviewHandle, Arc<[u8]>>,
}

impl PreviewRegistry {
    pub fn create(&mut self, file: &SelectedFile) -> PreviewHandle {
        let handle = PreviewHandle(format!("{PREVIEW_SCHEME}{}", uuid::Uuid::new_v4()));
        self.live.insert(handle.clone(), Arc::clone(&file.data));
        handle
    }

    /// Release a handle. Returns false if it was not live.
    pub fn revoke(&mut self, handle: &PreviewHandle) -> bool {
        self.live.remove(handle).is_some()
    }

    #[cfg(test)]
    pub fn resolve(&self, handle: &PreviewHandle) -> Option<Arc<[u8]>> {
        self.live.get(handle).cloned()
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.live.contains_key(handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[derive(Debug)]
struct StagedImage {
    file: SelectedFile,
    preview: PreviewHandle,
}

/// What the UI needs to draw a staged thumbnail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedPreview {
    pub name: String,
    pub media_type: String,
    pub preview_url: String,
}

/// Ordered images waiting to be sent
#[derive(Debug, Default)]
pub struct UploadStagingArea {
    entries: Vec<StagedImage>,
    previews: PreviewRegistry,
}

impl UploadStagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the image files among `files`, keeping their order.
    ///
    /// Returns the number of files staged. Fails without changing anything
    /// when files were given but none of them is an image.
    pub fn add(&mut self, files: Vec<SelectedFile>) -> Result<usize, ValidationError> {
        if files.is_empty() {
            return Ok(0);
        }
        let total = files.len();
        let images: Vec<SelectedFile> = files.into_iter().filter(SelectedFile::is_image).collect();
        if images.is_empty() {
            return Err(ValidationError::NoValidImages { rejected: total });
        }
        if images.len() < total {
            tracing::debug!(
                accepted = images.len(),
                rejected = total - images.len(),
                "Dropped non-image files"
            );
        }

        let accepted = images.len();
        for file in images {
            let preview = self.previews.create(&file);
            self.entries.push(StagedImage { file, preview });
        }
        Ok(accepted)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<SelectedFile, ValidationError> {
        if index >= self.entries.len() {
            return Err(ValidationError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let entry = self.entries.remove(index);
        self.previews.revoke(&entry.preview);
        Ok(entry.file)
    }

    /// Revoke every preview handle, then drop all entries
    pub fn clear(&mut self) {
        for entry in &self.entries {
            self.previews.revoke(&entry.preview);
        }
        self.entries.clear();
    }

    /// Files in staging order, for upload
    pub fn files(&self) -> Vec<SelectedFile> {
        self.entries.iter().map(|e| e.file.clone()).collect()
    }

    pub fn previews(&self) -> Vec<StagedPreview> {
        self.entries
            .iter()
            .map(|e| StagedPreview {
                name: e.file.name.clone(),
                media_type: e.file.media_type.clone(),
                preview_url: e.preview.url().to_string(),
            })
            .collect()
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for UploadStagingArea {
    fn drop(&mut self) {
        self.clear();
    }
}
