//! Boundary to the media-center host.
//!
//! Everything the addon asks of the host (directory listings, resolved
//! playback, language strings, settings, addon info) goes through [`Host`].
//! The router itself never talks to the host; handlers do, via
//! [`crate::Context`].

use crate::listitem::ListItem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host call {call} failed: {message}")]
    Call { call: &'static str, message: String },
}

/// Sort orders offered to the user for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMethod {
    Unsorted,
    Label,
    LabelIgnoreThe,
    Title,
    Date,
    Year,
    Duration,
    Genre,
    Episode,
    VideoRating,
    PlayCount,
    Size,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryItem {
    pub url: String,
    pub item: ListItem,
    pub is_folder: bool,
}

impl DirectoryItem {
    pub fn folder(url: impl Into<String>, item: ListItem) -> Self {
        Self {
            url: url.into(),
            item,
            is_folder: true,
        }
    }

    pub fn playable(url: impl Into<String>, item: ListItem) -> Self {
        Self {
            url: url.into(),
            item,
            is_folder: false,
        }
    }
}

/// Callbacks and lookups provided by the host runtime.
pub trait Host {
    fn add_directory_items(&mut self, handle: i32, items: &[DirectoryItem]) -> Result<(), HostError>;

    fn set_content(&mut self, handle: i32, content: &str) -> Result<(), HostError>;

    fn add_sort_method(&mut self, handle: i32, method: SortMethod) -> Result<(), HostError>;

    fn end_of_directory(&mut self, handle: i32, succeeded: bool) -> Result<(), HostError>;

    fn set_resolved_url(
        &mut self,
        handle: i32,
        succeeded: bool,
        item: &ListItem,
    ) -> Result<(), HostError>;

    /// String from the addon's language file; empty when the id is unknown.
    fn localized_string(&self, id: u32) -> String;

    fn setting_string(&self, key: &str) -> String;

    /// Addon metadata such as `id`, `path` or `profile`.
    fn addon_info(&self, key: &str) -> String;

    /// Turn a `special://` path into a real filesystem path.
    fn translate_path(&self, path: &str) -> PathBuf {
        PathBuf::from(path)
    }
}

/// Publish a complete listing: items, optional content type, sort methods
/// (always starting with [`SortMethod::Unsorted`]) and the end marker.
pub fn set_directory_items(
    host: &mut dyn Host,
    handle: i32,
    items: &[DirectoryItem],
    content: Option<&str>,
    sort_methods: &[SortMethod],
) -> Result<(), HostError> {
    let items: Vec<DirectoryItem> = items
        .iter()
        .map(|entry| DirectoryItem {
            url: entry.url.clone(),
            item: entry.item.localize(|id| host.localized_string(id)),
            is_folder: entry.is_folder,
        })
        .collect();

    tracing::debug!(handle, count = items.len(), "Publishing directory listing");
    host.add_directory_items(handle, &items)?;

    if let Some(content) = content.filter(|content| !content.is_empty()) {
        host.set_content(handle, content)?;
    }

    host.add_sort_method(handle, SortMethod::Unsorted)?;
    for method in sort_methods {
        host.add_sort_method(handle, *method)?;
    }

    host.end_of_directory(handle, true)
}

pub fn set_resolved_url(
    host: &mut dyn Host,
    handle: i32,
    succeeded: bool,
    item: &ListItem,
) -> Result<(), HostError> {
    let item = item.localize(|id| host.localized_string(id));
    tracing::debug!(handle, succeeded, path = ?item.path, "Resolving playback");
    host.set_resolved_url(handle, succeeded, &item)
}
