//! List items handed to the host's directory and playback callbacks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Art slots filled by [`ListItem::set_art_all`].
pub const ART_KEYS: [&str; 8] = [
    "thumb",
    "poster",
    "banner",
    "fanart",
    "clearart",
    "clearlogo",
    "landscape",
    "icon",
];

/// Label text, either literal or a string id from the addon's language file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Localized(u32),
}

impl Label {
    pub fn resolve(&self, lookup: impl Fn(u32) -> String) -> String {
        match self {
            Label::Text(text) => text.clone(),
            Label::Localized(id) => lookup(*id),
        }
    }
}

impl Default for Label {
    fn default() -> Self {
        Label::Text(String::new())
    }
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Label::Text(text.to_string())
    }
}

impl From<String> for Label {
    fn from(text: String) -> Self {
        Label::Text(text)
    }
}

impl From<u32> for Label {
    fn from(id: u32) -> Self {
        Label::Localized(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenuItem {
    pub label: Label,
    /// Builtin executed by the host, e.g. `RunPlugin(plugin://...)`.
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub label: Label,
    #[serde(default)]
    pub label2: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub art: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_menu: Vec<ContextMenuItem>,
    #[serde(default)]
    pub replace_context_menu: bool,
}

impl ListItem {
    pub fn new(label: impl Into<Label>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_label2(mut self, label2: impl Into<Label>) -> Self {
        self.label2 = label2.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the icon, thumbnail and poster images in one go. Empty strings
    /// leave the slot unset.
    pub fn with_images(mut self, icon: &str, thumbnail: &str, poster: &str) -> Self {
        for (key, url) in [("icon", icon), ("thumb", thumbnail), ("poster", poster)] {
            if !url.is_empty() {
                self.art.insert(key.to_string(), url.to_string());
            }
        }
        self
    }

    /// Merge art slots, overwriting any that are already set.
    pub fn set_art<K, V>(&mut self, art: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.art
            .extend(art.into_iter().map(|(key, url)| (key.into(), url.into())));
    }

    /// Use one image for every art slot.
    pub fn set_art_all(&mut self, url: &str) {
        self.set_art(ART_KEYS.iter().map(|key| (*key, url)));
    }

    pub fn add_context_menu_items<L, A>(
        &mut self,
        items: impl IntoIterator<Item = (L, A)>,
        replace: bool,
    ) where
        L: Into<Label>,
        A: Into<String>,
    {
        self.context_menu
            .extend(items.into_iter().map(|(label, action)| ContextMenuItem {
                label: label.into(),
                action: action.into(),
            }));
        self.replace_context_menu = replace;
    }

    /// Copy of the item with every localized label replaced by its text.
    pub fn localize(&self, lookup: impl Fn(u32) -> String) -> ListItem {
        ListItem {
            label: Label::Text(self.label.resolve(&lookup)),
            label2: Label::Text(self.label2.resolve(&lookup)),
            context_menu: self
                .context_menu
                .iter()
                .map(|entry| ContextMenuItem {
                    label: Label::Text(entry.label.resolve(&lookup)),
                    action: entry.action.clone(),
                })
                .collect(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(id: u32) -> String {
        match id {
            30001 => "Popular".to_string(),
            30002 => "Add to watchlist".to_string(),
            _ => String::new(),
        }
    }

    #[test]
    fn localize_resolves_every_label() {
        let mut item = ListItem::new(30001u32).with_label2("2023");
        item.add_context_menu_items([(Label::from(30002u32), "RunPlugin(x)")], false);

        let resolved = item.localize(lookup);
        assert_eq!(resolved.label, Label::Text("Popular".into()));
        assert_eq!(resolved.label2, Label::Text("2023".into()));
        assert_eq!(
            resolved.context_menu[0].label,
            Label::Text("Add to watchlist".into())
        );
        assert_eq!(resolved.context_menu[0].action, "RunPlugin(x)");
    }

    #[test]
    fn set_art_all_fills_every_slot() {
        let mut item = ListItem::new("Movie").with_images("icon.png", "", "");
        item.set_art_all("fanart.jpg");
        assert_eq!(item.art.len(), ART_KEYS.len());
        assert!(item.art.values().all(|url| url == "fanart.jpg"));
    }

    #[test]
    fn with_images_skips_empty_slots() {
        let item = ListItem::new("Movie").with_images("", "thumb.jpg", "poster.jpg");
        assert_eq!(item.art.get("thumb").map(String::as_str), Some("thumb.jpg"));
        assert!(!item.art.contains_key("icon"));
    }
}
