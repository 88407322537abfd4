#[cfg(feature = "span")]
use miette::SourceSpan;

use std::collections::HashMap;

use crate::{value::infer_quote, SetValue, YamlError, YamlKey, YamlValue};

/// Stable handle of a [`YamlNode`] inside a [`crate::YamlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One entry of a node's ordered content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A scalar or sequence item.
    Value(YamlValue),
    /// A child mapping entry.
    Node(NodeId),
}

/// A tree vertex. A node either bears values (a scalar or a sequence) or
/// maps names to child nodes, never both.
#[derive(Debug, Clone)]
pub struct YamlNode {
    pub(crate) key: YamlKey,
    pub(crate) comment: String,
    pub(crate) inline_comment: String,
    pub(crate) elements: Vec<Element>,
    pub(crate) children: HashMap<String, NodeId>,
    pub(crate) flow: bool,
    pub(crate) dash_items: bool,
    pub(crate) compact: bool,
    pub(crate) parent: Option<NodeId>,
    #[cfg(feature = "span")]
    pub(crate) span: Option<SourceSpan>,
    #[cfg(feature = "span")]
    pub(crate) line: Option<usize>,
}

impl YamlNode {
    pub(crate) fn new(key: impl Into<YamlKey>) -> Self {
        YamlNode {
            key: key.into(),
            comment: String::new(),
            inline_comment: String::new(),
            elements: Vec::new(),
            children: HashMap::new(),
            flow: false,
            dash_items: false,
            compact: false,
            parent: None,
            #[cfg(feature = "span")]
            span: None,
            #[cfg(feature = "span")]
            line: None,
        }
    }

    /// Gets this node's key.
    pub fn key(&self) -> &YamlKey {
        &self.key
    }

    /// Gets this node's decoded name. Empty for the document root.
    pub fn name(&self) -> &str {
        self.key.value()
    }

    /// Comment and blank lines written before the key line.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Sets the lines written before the key line. Each line must end with a
    /// newline and be a comment or blank.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Comment following `key:` on a line that carries no scalar, or
    /// following the `]` of a flow sequence.
    pub fn inline_comment(&self) -> &str {
        &self.inline_comment
    }

    /// Sets the comment written after `key:` when no scalar follows it.
    pub fn set_inline_comment(&mut self, comment: impl Into<String>) {
        self.inline_comment = comment.into();
    }

    /// Parent node, `None` for a root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Gets this node's source span.
    ///
    /// This value is only set for nodes created by parsing, and may point
    /// at stale text once the document has been mutated.
    #[cfg(feature = "span")]
    pub fn span(&self) -> Option<SourceSpan> {
        self.span
    }

    /// 1-based source line of this node's key, for nodes read from text.
    #[cfg(feature = "span")]
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Ordered content of this node.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Iterates over the values this node bears.
    pub fn values(&self) -> impl Iterator<Item = &YamlValue> + '_ {
        self.elements.iter().filter_map(|e| match e {
            Element::Value(v) => Some(v),
            Element::Node(_) => None,
        })
    }

    /// Iterates over this node's children, in document order.
    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.elements.iter().filter_map(|e| match e {
            Element::Node(id) => Some(*id),
            Element::Value(_) => None,
        })
    }

    /// Looks up a direct child by its decoded name.
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Number of values this node bears.
    pub fn value_count(&self) -> usize {
        self.values().count()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// The single scalar of a scalar node.
    pub fn value(&self) -> Option<&YamlValue> {
        if self.value_count() == 1 {
            self.values().next()
        } else {
            None
        }
    }

    /// The `index`th value, counting values only.
    pub fn value_at(&self, index: usize) -> Option<&YamlValue> {
        self.values().nth(index)
    }

    /// Mutable access to the `index`th value.
    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut YamlValue> {
        self.elements
            .iter_mut()
            .filter_map(|e| match e {
                Element::Value(v) => Some(v),
                Element::Node(_) => None,
            })
            .nth(index)
    }

    /// Returns `true` if this node holds child keys.
    pub fn is_mapping(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns `true` if this node holds at least one value or is an
    /// (possibly empty) flow sequence.
    pub fn is_value_bearing(&self) -> bool {
        self.flow || self.value_count() > 0
    }

    /// A sequence with more than one item, written one `- item` per line.
    pub fn is_block_sequence(&self) -> bool {
        !self.flow && self.value_count() >= 2
    }

    /// A sequence written inline as `[ a, b ]`.
    pub fn is_flow_sequence(&self) -> bool {
        self.flow
    }

    /// Returns `true` for either kind of sequence.
    pub fn is_sequence(&self) -> bool {
        self.flow || self.value_count() >= 2
    }

    /// Switches between inline and block layout. Rejected on a mapping.
    pub fn set_flow_sequence(&mut self, flow: bool) -> Result<(), YamlError> {
        if flow && self.is_mapping() {
            return Err(YamlError::conflict(
                self.name(),
                "it holds sub keys and cannot become a list",
            ));
        }
        self.flow = flow;
        if !flow {
            self.dash_items = true;
        }
        Ok(())
    }

    /// Appends a value. A second value turns a scalar into a block sequence.
    pub fn add_value(&mut self, value: impl Into<YamlValue>) -> Result<(), YamlError> {
        if self.is_mapping() {
            return Err(YamlError::conflict(
                self.name(),
                "it is not possible to add a value to a node holding sub keys",
            ));
        }
        self.elements.push(Element::Value(value.into()));
        Ok(())
    }

    /// Removes and returns the `index`th value.
    pub fn remove_value(&mut self, index: usize) -> Option<YamlValue> {
        let pos = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Element::Value(_)))
            .nth(index)
            .map(|(pos, _)| pos)?;
        match self.elements.remove(pos) {
            Element::Value(v) => Some(v),
            Element::Node(_) => None,
        }
    }

    /// Drops every value and the sequence layout.
    pub fn clear_values(&mut self) {
        self.elements.retain(|e| matches!(e, Element::Node(_)));
        self.flow = false;
        self.dash_items = false;
        self.compact = false;
    }

    /// Replaces this node's content.
    ///
    /// A scalar updates a lone existing value in place, so its comment and
    /// quote survive. A sequence replaces all values, each with its own
    /// inferred quoting. [`SetValue::Null`] clears the node.
    pub fn set(&mut self, value: impl Into<SetValue>) -> Result<(), YamlError> {
        let value = value.into();
        tracing::trace!(key = self.name(), ?value, "set node");
        match value {
            SetValue::Null => {
                self.lift_comment();
                self.clear_values();
                Ok(())
            }
            SetValue::Sequence { items, style } => {
                if self.is_mapping() {
                    return Err(YamlError::conflict(
                        self.name(),
                        "it holds sub keys and cannot become a list",
                    ));
                }
                self.lift_comment();
                self.clear_values();
                let flow = style == crate::SequenceStyle::Flow || items.is_empty();
                for item in items {
                    self.elements
                        .push(Element::Value(YamlValue::with_inferred_quote(item)));
                }
                self.flow = flow;
                self.dash_items = !flow;
                Ok(())
            }
            SetValue::Text(text) => self.set_scalar(text, true),
            SetValue::Plain(text) => self.set_scalar(text, false),
        }
    }

    // A lone scalar's comment moves up to the key line when the scalar goes.
    fn lift_comment(&mut self) {
        if !self.inline_comment.is_empty() || self.dash_items || self.flow {
            return;
        }
        if let Some(value) = self.value_at_mut(0) {
            self.inline_comment = std::mem::take(&mut value.trailing);
        }
    }

    fn set_scalar(&mut self, text: String, infer: bool) -> Result<(), YamlError> {
        if self.is_mapping() {
            return Err(YamlError::conflict(
                self.name(),
                "it holds sub keys and cannot take a value",
            ));
        }
        // A new scalar carries the comment that sat on the key line.
        let fresh = |text: String, comment: String| {
            let mut value = if infer {
                YamlValue::with_inferred_quote(text)
            } else {
                YamlValue::new(text)
            };
            value.trailing = comment;
            value
        };
        match self.value_count() {
            0 => {
                self.flow = false;
                let comment = std::mem::take(&mut self.inline_comment);
                self.elements.push(Element::Value(fresh(text, comment)));
            }
            1 if !self.flow => {
                if let Some(existing) = self.value_at_mut(0) {
                    if existing.quote.is_none() && infer {
                        existing.quote = infer_quote(&text);
                    }
                    existing.set_text(text);
                }
            }
            _ => {
                let comment = std::mem::take(&mut self.inline_comment);
                self.clear_values();
                self.elements.push(Element::Value(fresh(text, comment)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Quote, SequenceStyle};

    #[test]
    fn values_and_sequences() -> miette::Result<()> {
        let mut node = YamlNode::new("List");
        assert!(!node.is_value_bearing());

        node.add_value("a")?;
        assert_eq!(node.value().map(YamlValue::text), Some("a"));
        assert!(!node.is_block_sequence());

        node.add_value("b")?;
        assert!(node.is_block_sequence());
        assert_eq!(node.value(), None);
        assert_eq!(node.value_at(1).map(YamlValue::text), Some("b"));

        assert_eq!(node.remove_value(0).map(|v| v.text), Some("a".into()));
        assert!(!node.is_block_sequence());
        assert_eq!(node.value().map(YamlValue::text), Some("b"));
        Ok(())
    }

    #[test]
    fn mapping_rejects_values() {
        let mut node = YamlNode::new("Map");
        node.children.insert("child".into(), NodeId(1));
        node.elements.push(Element::Node(NodeId(1)));

        assert!(node.add_value("x").is_err());
        assert!(node.set("x").is_err());
        assert!(node.set(vec!["x", "y"]).is_err());
        assert!(node.set(None::<&str>).is_ok());
        assert_eq!(node.child_count(), 1);
    }

    #[test]
    fn set_scalar_keeps_metadata() -> miette::Result<()> {
        let mut node = YamlNode::new("Lang1");
        let mut value = YamlValue::new("text");
        value.quote = Some(Quote::Double);
        value.repr = Some("\"text\"".into());
        value.trailing = " # greeting".into();
        node.add_value(value)?;

        node.set("new text")?;
        let value = node.value().expect("scalar");
        assert_eq!(value.text(), "new text");
        assert_eq!(value.quote(), Some(Quote::Double));
        assert_eq!(value.trailing_comment(), " # greeting");
        assert_eq!(value.repr(), None);
        Ok(())
    }

    #[test]
    fn set_infers_quotes_for_unsafe_text() -> miette::Result<()> {
        let mut node = YamlNode::new("Password");
        node.add_value("plain")?;
        node.set("P@SS#WORD")?;
        assert_eq!(node.value().and_then(YamlValue::quote), Some(Quote::Double));

        node.set(8080)?;
        assert_eq!(node.value().map(YamlValue::text), Some("8080"));
        Ok(())
    }

    #[test]
    fn set_sequences() -> miette::Result<()> {
        let mut node = YamlNode::new("Data");
        node.set(["data1", "data2"])?;
        assert!(node.is_flow_sequence());
        assert_eq!(node.value_count(), 2);

        node.set(SetValue::Sequence {
            items: vec!["x".into(), "y y".into(), "z".into()],
            style: SequenceStyle::Block,
        })?;
        assert!(node.is_block_sequence());
        assert_eq!(node.value_at(1).and_then(YamlValue::quote), Some(Quote::Double));

        node.set(Vec::<String>::new())?;
        assert!(node.is_flow_sequence());
        assert_eq!(node.value_count(), 0);
        assert!(node.is_value_bearing());

        node.set("single")?;
        assert!(!node.is_sequence());
        assert_eq!(node.value().map(YamlValue::text), Some("single"));

        node.set(None::<String>)?;
        assert!(!node.is_value_bearing());
        Ok(())
    }
}
