//! In-memory [`Host`] that records every callback.
//!
//! Used by tests and by the demo binary, which prints the recorded calls as
//! JSON lines instead of rendering them.

use crate::host::{DirectoryItem, Host, HostError, SortMethod};
use crate::listitem::ListItem;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    AddDirectoryItems {
        handle: i32,
        items: Vec<DirectoryItem>,
    },
    SetContent {
        handle: i32,
        content: String,
    },
    AddSortMethod {
        handle: i32,
        method: SortMethod,
    },
    EndOfDirectory {
        handle: i32,
        succeeded: bool,
    },
    SetResolvedUrl {
        handle: i32,
        succeeded: bool,
        item: ListItem,
    },
}

impl HostCall {
    fn name(&self) -> &'static str {
        match self {
            HostCall::AddDirectoryItems { .. } => "add_directory_items",
            HostCall::SetContent { .. } => "set_content",
            HostCall::AddSortMethod { .. } => "add_sort_method",
            HostCall::EndOfDirectory { .. } => "end_of_directory",
            HostCall::SetResolvedUrl { .. } => "set_resolved_url",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    calls: Vec<HostCall>,
    strings: HashMap<u32, String>,
    settings: HashMap<String, String>,
    info: HashMap<String, String>,
    failing: Option<&'static str>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string(mut self, id: u32, text: impl Into<String>) -> Self {
        self.strings.insert(id, text.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    /// Make the named callback (e.g. `"end_of_directory"`) fail.
    pub fn failing_on(mut self, call: &'static str) -> Self {
        self.failing = Some(call);
        self
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }

    fn record(&mut self, call: HostCall) -> Result<(), HostError> {
        let name = call.name();
        if self.failing == Some(name) {
            return Err(HostError::Call {
                call: name,
                message: "rejected by recording host".to_string(),
            });
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Host for RecordingHost {
    fn add_directory_items(&mut self, handle: i32, items: &[DirectoryItem]) -> Result<(), HostError> {
        self.record(HostCall::AddDirectoryItems {
            handle,
            items: items.to_vec(),
        })
    }

    fn set_content(&mut self, handle: i32, content: &str) -> Result<(), HostError> {
        self.record(HostCall::SetContent {
            handle,
            content: content.to_string(),
        })
    }

    fn add_sort_method(&mut self, handle: i32, method: SortMethod) -> Result<(), HostError> {
        self.record(HostCall::AddSortMethod { handle, method })
    }

    fn end_of_directory(&mut self, handle: i32, succeeded: bool) -> Result<(), HostError> {
        self.record(HostCall::EndOfDirectory { handle, succeeded })
    }

    fn set_resolved_url(
        &mut self,
        handle: i32,
        succeeded: bool,
        item: &ListItem,
    ) -> Result<(), HostError> {
        self.record(HostCall::SetResolvedUrl {
            handle,
            succeeded,
            item: item.clone(),
        })
    }

    fn localized_string(&self, id: u32) -> String {
        self.strings.get(&id).cloned().unwrap_or_default()
    }

    fn setting_string(&self, key: &str) -> String {
        self.settings.get(key).cloned().unwrap_or_default()
    }

    fn addon_info(&self, key: &str) -> String {
        self.info.get(key).cloned().unwrap_or_default()
    }
}
