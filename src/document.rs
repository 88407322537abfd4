use std::{
    collections::HashMap,
    fmt::Display,
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
    str::FromStr,
};

use regex::Regex;

use crate::{
    fmt::Writer,
    index::{join, KeyIndex},
    reader::{read, ParseOptions, DEFAULT_INDENT},
    NodeId, SetValue, YamlError, YamlNode, YamlParseError, YamlTree, YamlValue,
};

/// A parsed document, addressed through dotted keys such as
/// `"Database.User"`.
///
/// Everything not touched by a mutation is written back exactly as it was
/// read: comments, blank lines, quoting, indentation and list layout.
///
/// ```rust
/// use yamlcfg::YamlDocument;
///
/// let mut doc: YamlDocument = "Language:\n  Lang1: \"text\" # hi\n  Lang2: \"ext\"\n".parse()?;
/// assert_eq!(doc.get_string("Language.Lang2")?, "ext");
///
/// doc.set("Language.Lang1", "new text")?;
/// assert_eq!(
///     doc.to_string(),
///     "Language:\n  Lang1: \"new text\" # hi\n  Lang2: \"ext\"\n"
/// );
/// # Ok::<(), yamlcfg::YamlError>(())
/// ```
#[derive(Debug, Clone)]
pub struct YamlDocument {
    tree: YamlTree,
    index: KeyIndex,
    footer: String,
    indent: usize,
    newline: &'static str,
}

impl Default for YamlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlDocument {
    /// Creates an empty document indented by 4 spaces.
    pub fn new() -> Self {
        let tree = YamlTree::new();
        let index = KeyIndex::build(&tree);
        YamlDocument {
            tree,
            index,
            footer: String::new(),
            indent: DEFAULT_INDENT,
            newline: "\n",
        }
    }

    /// Parses a document, detecting its indentation width.
    pub fn parse(input: &str) -> Result<Self, YamlParseError> {
        Self::parse_with(input, ParseOptions::default())
    }

    /// Parses a document with explicit options.
    pub fn parse_with(input: &str, options: ParseOptions) -> Result<Self, YamlParseError> {
        let out = read(input, options)?;
        let index = KeyIndex::build(&out.tree);
        Ok(YamlDocument {
            tree: out.tree,
            index,
            footer: out.footer,
            indent: out.indent,
            newline: out.newline,
        })
    }

    /// Reads and parses the file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, YamlError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    /// Drains `reader` and parses what it produced.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, YamlError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(&text)?)
    }

    /// Writes the document to `path`, replacing the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), YamlError> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Writes the document to `out` and flushes it.
    pub fn write_to(&self, mut out: impl Write) -> Result<(), YamlError> {
        out.write_all(self.to_string().as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// The underlying node tree.
    pub fn tree(&self) -> &YamlTree {
        &self.tree
    }

    /// Comment and blank lines after the last entry.
    pub fn footer(&self) -> &str {
        &self.footer
    }

    /// Sets the lines written after the last entry.
    pub fn set_footer(&mut self, footer: impl Into<String>) {
        self.footer = footer.into();
    }

    /// Indentation width used per nesting level.
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Sets the indentation width used when writing. A width of 0 would
    /// flatten the document and is ignored.
    pub fn set_indent(&mut self, width: usize) {
        if width > 0 {
            self.indent = width;
        }
    }

    /// Line ending detected on load, `"\n"` for new documents.
    pub fn newline(&self) -> &str {
        self.newline
    }

    /// Removes every entry and the footer.
    pub fn clear(&mut self) {
        self.tree = YamlTree::new();
        self.index = KeyIndex::build(&self.tree);
        self.footer.clear();
    }

    /// Returns `true` if `key` holds a value or a list.
    pub fn is_set(&self, key: &str) -> bool {
        self.index.value(key).is_some()
    }

    /// The node at `key`, whether it holds values or sub keys.
    pub fn node(&self, key: &str) -> Option<&YamlNode> {
        self.index.node(key).map(|id| &self.tree[id])
    }

    /// Replaces the comment block written above `key`.
    pub fn set_comment(&mut self, key: &str, comment: impl Into<String>) -> Result<(), YamlError> {
        let id = self
            .index
            .node(key)
            .ok_or_else(|| YamlError::KeyNotFound(key.to_string()))?;
        self.tree[id].set_comment(comment);
        Ok(())
    }

    /// The scalar at `key`. A numeric last segment, as in `"List.1"`,
    /// selects a list item.
    pub fn get_value(&self, key: &str) -> Option<&YamlValue> {
        if let Some(id) = self.index.value(key) {
            return self.tree[id].value();
        }
        let (parent, item) = self.item_address(key)?;
        self.tree[parent].value_at(item)
    }

    /// Mutable access to the scalar at `key`, for adjusting its comments or
    /// quoting.
    pub fn value_mut(&mut self, key: &str) -> Option<&mut YamlValue> {
        let (id, item) = match self.index.value(key) {
            Some(id) if self.tree[id].value_count() == 1 => (id, 0),
            Some(_) => return None,
            None => self.item_address(key)?,
        };
        self.tree[id].value_at_mut(item)
    }

    /// The text at `key`. A key without values or sub keys reads as `""`.
    pub fn get_string(&self, key: &str) -> Result<&str, YamlError> {
        if let Some(value) = self.get_value(key) {
            return Ok(value.text());
        }
        match self.index.node(key).map(|id| &self.tree[id]) {
            Some(node) if node.is_sequence() => Err(YamlError::conversion(
                key,
                "",
                "the key holds a list, not a single value",
            )),
            Some(node) if !node.is_mapping() && node.parent().is_some() => Ok(""),
            _ => Err(YamlError::KeyNotFound(key.to_string())),
        }
    }

    /// Like [`YamlDocument::get_string`], falling back to `default`.
    pub fn get_string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_string(key).unwrap_or(default)
    }

    /// The texts of the list at `key`. A scalar reads as a one-item list and
    /// `[]` as an empty one.
    pub fn get_string_list(&self, key: &str) -> Result<Vec<&str>, YamlError> {
        if let Some(id) = self.index.value(key) {
            return Ok(self.tree[id].values().map(YamlValue::text).collect());
        }
        self.get_value(key)
            .map(|value| vec![value.text()])
            .ok_or_else(|| YamlError::KeyNotFound(key.to_string()))
    }

    /// Like [`YamlDocument::get_string_list`], falling back to `default`.
    pub fn get_string_list_or<'a>(&'a self, key: &str, default: &[&'a str]) -> Vec<&'a str> {
        self.get_string_list(key)
            .unwrap_or_else(|_| default.to_vec())
    }

    /// Sets the content at `key`, creating missing intermediate keys.
    ///
    /// An existing scalar is updated in place, keeping its comment and
    /// quote. New keys are placed next to siblings they share a prefix with.
    /// `None` clears a key and removes a list item.
    ///
    /// ```rust
    /// use yamlcfg::{SetValue, YamlDocument};
    ///
    /// let mut doc = YamlDocument::new();
    /// doc.set("server.port", 8080)?;
    /// doc.set("server.hosts", vec!["a", "b"])?;
    /// doc.set("server.tags", ["x", "y"])?;
    /// doc.set("server.hosts.1", "c")?;
    /// assert_eq!(
    ///     doc.to_string(),
    ///     "server:\n    port: 8080\n    hosts:\n        - a\n        - c\n    tags: [ x, y ]\n"
    /// );
    /// # Ok::<(), yamlcfg::YamlError>(())
    /// ```
    pub fn set(&mut self, key: &str, value: impl Into<SetValue>) -> Result<(), YamlError> {
        let value = value.into();
        tracing::trace!(key, ?value, "set");

        if let Some(id) = self.index.node(key) {
            self.tree[id].set(value).map_err(|e| at_key(e, key))?;
            self.index.sync_value(&self.tree, key, id);
            return Ok(());
        }
        if let Some((parent, item)) = self.item_address(key) {
            return self.set_item(key, parent, item, value);
        }
        if value.is_null() {
            return Ok(());
        }

        let mut id = self.tree.root();
        let mut path = String::new();
        for segment in key.split('.') {
            let child_path = join(&path, segment);
            id = match self.index.node(&child_path) {
                Some(existing) => existing,
                None => {
                    let child = self
                        .tree
                        .add_child(id, segment)
                        .map_err(|e| at_key(e, &path))?;
                    self.index.insert_node(child_path.clone(), child);
                    child
                }
            };
            path = child_path;
        }
        self.tree[id].set(value).map_err(|e| at_key(e, key))?;
        self.index.sync_value(&self.tree, key, id);
        Ok(())
    }

    fn set_item(
        &mut self,
        key: &str,
        parent: NodeId,
        item: usize,
        value: SetValue,
    ) -> Result<(), YamlError> {
        let parent_key = key.rsplit_once('.').map_or("", |(parent, _)| parent);
        let node = &mut self.tree[parent];
        let text = match value {
            SetValue::Null => {
                node.remove_value(item);
                self.index.sync_value(&self.tree, parent_key, parent);
                return Ok(());
            }
            SetValue::Text(text) | SetValue::Plain(text) => text,
            SetValue::Sequence { .. } => {
                return Err(YamlError::conflict(key, "a list item cannot hold a list"))
            }
        };
        match node.value_at_mut(item) {
            Some(existing) => {
                if existing.quote().is_none() {
                    existing.quote = crate::value::infer_quote(&text);
                }
                existing.set_text(text);
            }
            None => {
                node.add_value(YamlValue::with_inferred_quote(text))?;
                node.dash_items = !node.flow;
            }
        }
        Ok(())
    }

    /// Resolves `List.1` style keys to a list node and an item position. The
    /// position one past the end is valid, for appending.
    fn item_address(&self, key: &str) -> Option<(NodeId, usize)> {
        let (parent, last) = key.rsplit_once('.').unwrap_or(("", key));
        if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let item = last.parse().ok()?;
        let id = self.index.value(parent)?;
        let node = &self.tree[id];
        let count = node.value_count();
        if item < count || (item == count && (node.is_sequence() || node.dash_items)) {
            Some((id, item))
        } else {
            None
        }
    }

    /// Removes `key` and everything below it. A numeric last segment removes
    /// a single list item.
    pub fn remove(&mut self, key: &str) -> Result<(), YamlError> {
        if key.is_empty() {
            self.clear();
            return Ok(());
        }
        if let Some(id) = self.index.node(key) {
            self.tree.remove_child(id);
            self.index.remove_subtree(key);
            return Ok(());
        }
        match self.item_address(key) {
            Some((parent, item)) if self.tree[parent].value_at(item).is_some() => {
                self.set_item(key, parent, item, SetValue::Null)
            }
            _ => Err(YamlError::KeyNotFound(key.to_string())),
        }
    }

    /// Copies the subtree at `key` into an independent document rooted at
    /// that node.
    pub fn section(&self, key: &str) -> Result<YamlDocument, YamlError> {
        let id = self
            .index
            .node(key)
            .ok_or_else(|| YamlError::KeyNotFound(key.to_string()))?;
        let tree = self.tree.deep_copy(id);
        let index = KeyIndex::build(&tree);
        tracing::debug!(key, "extracted section");
        Ok(YamlDocument {
            tree,
            index,
            footer: String::new(),
            indent: self.indent,
            newline: self.newline,
        })
    }

    /// Keys holding values or lists, in document order. Without
    /// `include_sub_keys`, only keys directly below the root.
    pub fn keys(&self, include_sub_keys: bool) -> Vec<&str> {
        let root = self.tree.root();
        let position: HashMap<NodeId, usize> = self
            .tree
            .descendants(root)
            .into_iter()
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect();
        let mut keys: Vec<(&str, NodeId)> = self
            .index
            .value_keys()
            .filter(|(key, id)| {
                !key.is_empty() && (include_sub_keys || self.tree[*id].parent() == Some(root))
            })
            .collect();
        keys.sort_by_key(|(_, id)| position.get(id).copied());
        keys.into_iter().map(|(key, _)| key).collect()
    }

    /// Every key, including those that only group sub keys or hold nothing.
    pub fn all_keys(&self, include_sub_keys: bool) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_keys(self.tree.root(), String::new(), include_sub_keys, &mut keys);
        keys
    }

    fn collect_keys(&self, id: NodeId, prefix: String, deep: bool, keys: &mut Vec<String>) {
        for child in self.tree[id].child_ids() {
            let key = join(&prefix, self.tree[child].name());
            keys.push(key.clone());
            if deep {
                self.collect_keys(child, key, deep, keys);
            }
        }
    }

    /// Value keys matching `pattern` as a whole, in document order.
    pub fn keys_filtered(&self, pattern: &str) -> Result<Vec<&str>, YamlError> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(self
            .keys(true)
            .into_iter()
            .filter(|key| regex.is_match(key))
            .collect())
    }
}

fn at_key(err: YamlError, key: &str) -> YamlError {
    match err {
        YamlError::ContentConflict { reason, .. } => YamlError::conflict(key, reason),
        other => other,
    }
}

impl Display for YamlDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Writer::new(&self.tree, self.indent, self.newline).write_document(f, &self.footer)
    }
}

impl FromStr for YamlDocument {
    type Err = YamlParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        YamlDocument::parse(input)
    }
}

/// Documents are equal when their trees and footers are.
impl PartialEq for YamlDocument {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree && self.footer == other.footer
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parsing() -> miette::Result<()> {
        let doc: YamlDocument = "Test: 1\nTest2: 2\nTest3: 3".parse()?;
        assert_eq!(doc.get_string("Test")?, "1");
        assert_eq!(doc.get_string("Test3")?, "3");
        assert!(doc.is_set("Test2"));
        assert!(!doc.is_set("Test4"));
        assert!(matches!(
            doc.get_string("Test4"),
            Err(YamlError::KeyNotFound(key)) if key == "Test4"
        ));
        assert_eq!(doc.get_string_or("Test4", "dflt"), "dflt");
        Ok(())
    }

    #[test]
    fn lists() -> miette::Result<()> {
        let doc: YamlDocument = "List:\n  - This\n  - is\nOne: x\nFlow: [ a, b ]\nEmpty: []".parse()?;
        assert_eq!(doc.get_string_list("List")?, vec!["This", "is"]);
        assert_eq!(doc.get_string("List.1")?, "is");
        assert_eq!(doc.get_string_list("One")?, vec!["x"]);
        assert_eq!(doc.get_string_list("Empty")?, Vec::<&str>::new());
        assert_eq!(doc.get_string("Flow.0")?, "a");
        assert!(doc.get_string("List").is_err());
        assert!(doc.get_string("List.2").is_err());
        assert_eq!(doc.get_string_list_or("Nope", &["d"]), vec!["d"]);
        Ok(())
    }

    #[test]
    fn empty_keys() -> miette::Result<()> {
        let doc: YamlDocument = "Empty:\nGroup:\n  Inner: 1\n".parse()?;
        assert_eq!(doc.get_string("Empty")?, "");
        assert!(!doc.is_set("Empty"));
        assert!(doc.get_string("Group").is_err());
        assert_eq!(doc.all_keys(true), vec!["Empty", "Group", "Group.Inner"]);
        assert_eq!(doc.all_keys(false), vec!["Empty", "Group"]);
        Ok(())
    }

    #[test]
    fn set_and_create() -> miette::Result<()> {
        let mut doc: YamlDocument =
            "Language:\n  Lang1: \"text\"\n  Lang2: \"ext\"\n  Lang3: \"xt\"\n".parse()?;
        doc.set("Language.Lang1", "New language value")?;
        doc.set("Language.Lang1000", "New language key and value")?;
        assert_eq!(doc.get_string("Language.Lang1")?, "New language value");
        assert_eq!(
            doc.get_string("Language.Lang1000")?,
            "New language key and value"
        );
        assert_eq!(
            doc.to_string(),
            "Language:\n  Lang1: \"New language value\"\n  Lang1000: \"New language key and value\"\n  Lang2: \"ext\"\n  Lang3: \"xt\"\n"
        );
        Ok(())
    }

    #[test]
    fn set_conflicts() -> miette::Result<()> {
        let mut doc: YamlDocument = "a: 1\nb:\n  c: 2\n".parse()?;
        let err = doc.set("a.x", "y").unwrap_err();
        assert!(matches!(err, YamlError::ContentConflict { ref key, .. } if key == "a"));
        let err = doc.set("b", "z").unwrap_err();
        assert!(matches!(err, YamlError::ContentConflict { ref key, .. } if key == "b"));
        assert_eq!(doc.to_string(), "a: 1\nb:\n  c: 2\n");
        Ok(())
    }

    #[test]
    fn list_items() -> miette::Result<()> {
        let mut doc: YamlDocument = "List:\n- a\n- b\n".parse()?;
        doc.set("List.0", "A")?;
        doc.set("List.2", "c d")?;
        assert_eq!(doc.to_string(), "List:\n- A\n- b\n- \"c d\"\n");

        doc.set("List.1", None::<&str>)?;
        doc.remove("List.1")?;
        assert_eq!(doc.to_string(), "List:\n- A\n");
        assert_eq!(doc.get_string_list("List")?, vec!["A"]);
        assert!(doc.remove("List.5").is_err());
        Ok(())
    }

    #[test]
    fn null_and_removal() -> miette::Result<()> {
        let mut doc: YamlDocument = "a: 1\nb:\n  c: 2\n  d: 3\n".parse()?;
        doc.set("missing.key", None::<&str>)?;
        assert!(doc.node("missing").is_none());

        doc.set("a", None::<&str>)?;
        assert!(!doc.is_set("a"));
        assert_eq!(doc.get_string("a")?, "");

        doc.remove("b")?;
        assert!(!doc.is_set("b.c"));
        assert!(doc.node("b").is_none());
        assert_eq!(doc.to_string(), "a:\n");
        assert!(doc.remove("b").is_err());

        doc.set("b.c", "again")?;
        assert_eq!(doc.to_string(), "a:\nb:\n  c: again\n");
        Ok(())
    }

    #[test]
    fn sections() -> miette::Result<()> {
        let mut doc: YamlDocument = "Data1:\n  Data1_2: true\nData2:\n  Data2_1: true\n".parse()?;
        let mut section = doc.section("Data2")?;
        assert_eq!(section.keys(true), vec!["Data2_1"]);
        assert!(section.is_set("Data2_1"));

        doc.set("Data2.Data2_1", false)?;
        assert_eq!(section.get_string("Data2_1")?, "true");

        section.set("Data2_2", "x")?;
        assert!(!doc.is_set("Data2.Data2_2"));
        assert_eq!(section.to_string(), "Data2_1: true\nData2_2: x\n");

        assert!(doc.section("Data3").is_err());
        Ok(())
    }

    #[test]
    fn keys() -> miette::Result<()> {
        let doc: YamlDocument =
            "Line1: text\nLine2: text\nLine3: text\nLine4:\n  - group1\n  -group2\nGroup:\n  Sub: 1\n"
                .parse()?;
        assert_eq!(doc.keys(false), vec!["Line1", "Line2", "Line3", "Line4"]);
        assert_eq!(
            doc.keys(true),
            vec!["Line1", "Line2", "Line3", "Line4", "Group.Sub"]
        );
        assert_eq!(doc.keys_filtered("Line[13]")?, vec!["Line1", "Line3"]);
        assert!(matches!(
            doc.keys_filtered("("),
            Err(YamlError::InvalidPattern(_))
        ));
        Ok(())
    }

    #[test]
    fn keys_follow_document_order_after_set() -> miette::Result<()> {
        let mut doc: YamlDocument = "Lang1: a\nLang2: b\nMore:\n  x: 1\n".parse()?;
        doc.set("Lang10", "c")?;
        doc.set("More.a", 2)?;
        assert_eq!(doc.to_string(), "Lang1: a\nLang10: c\nLang2: b\nMore:\n  x: 1\n  a: 2\n");
        assert_eq!(doc.keys(false), vec!["Lang1", "Lang10", "Lang2"]);
        assert_eq!(
            doc.keys(true),
            vec!["Lang1", "Lang10", "Lang2", "More.x", "More.a"]
        );
        assert_eq!(doc.keys_filtered("Lang1.*")?, vec!["Lang1", "Lang10"]);
        Ok(())
    }

    #[test]
    fn root_sequence() -> miette::Result<()> {
        let mut doc: YamlDocument = "- 1\n- 2\n- 3".parse()?;
        assert_eq!(doc.get_string_list("")?, vec!["1", "2", "3"]);
        assert_eq!(doc.get_string("1")?, "2");
        assert!(doc.keys(true).is_empty());
        doc.set("", vec!["x"])?;
        assert_eq!(doc.to_string(), "- x\n");
        Ok(())
    }

    #[test]
    fn equality() -> miette::Result<()> {
        let a: YamlDocument = "a: 1 # c\nb: [ x ]\n".parse()?;
        let b: YamlDocument = a.to_string().parse()?;
        assert_eq!(a, b);
        let c: YamlDocument = "a: 1\nb: [ x ]\n".parse()?;
        assert_ne!(a, c);
        Ok(())
    }
}
