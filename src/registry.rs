use std::collections::HashMap;

/// Immutable descriptor for a tag name the tokenizer accepts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagDefinition {
    requires_close: bool,
}

impl TagDefinition {
    pub const fn new(requires_close: bool) -> Self {
        Self { requires_close }
    }

    /// A standalone tag such as `{% include "x" %}`.
    pub const fn inline() -> Self {
        Self::new(false)
    }

    /// A tag scoping a body that ends at `{% end<name> %}`.
    pub const fn block() -> Self {
        Self::new(true)
    }

    pub const fn requires_close(&self) -> bool {
        self.requires_close
    }
}

/// Registry of legal tag names
#[derive(Debug, Default, Clone)]
pub struct TagRegistry(HashMap<String, TagDefinition>);

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the tags most templates expect.
    pub fn builtin() -> Self {
        const BLOCKS: &[&str] = &[
            "autoescape",
            "block",
            "filter",
            "for",
            "if",
            "macro",
            "spaceless",
        ];
        const INLINE: &[&str] = &[
            "elif", "else", "empty", "extends", "import", "include", "parent", "set",
        ];

        BLOCKS
            .iter()
            .map(|name| (*name, TagDefinition::block()))
            .chain(INLINE.iter().map(|name| (*name, TagDefinition::inline())))
            .collect()
    }

    /// Register a tag, replacing any previous definition under the same name
    pub fn define(&mut self, name: impl Into<String>, definition: TagDefinition) {
        self.0.insert(name.into(), definition);
    }

    /// Get a tag definition by name
    pub fn get(&self, name: &str) -> Option<&TagDefinition> {
        self.0.get(name)
    }

    /// Check if a tag is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, TagDefinition)> for TagRegistry {
    fn from_iter<I: IntoIterator<Item = (S, TagDefinition)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, definition)| (name.into(), definition))
                .collect(),
        )
    }
}
