use std::fmt::{self, Write};

use crate::{NodeId, YamlTree, YamlValue};

/// Serializes a tree, reusing whatever formatting each node and value
/// carries.
pub(crate) struct Writer<'a> {
    tree: &'a YamlTree,
    tab: String,
    newline: &'a str,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(tree: &'a YamlTree, indent: usize, newline: &'a str) -> Self {
        Writer {
            tree,
            tab: " ".repeat(indent),
            newline,
        }
    }

    pub(crate) fn write_document(&self, out: &mut impl Write, footer: &str) -> fmt::Result {
        let root = self.tree.root();
        if self.tree[root].is_value_bearing() {
            for value in self.tree[root].values() {
                self.write_item(out, value, "")?;
            }
        } else {
            for child in self.tree[root].child_ids() {
                self.write_node(out, child, "")?;
            }
        }
        out.write_str(footer)
    }

    fn write_node(&self, out: &mut impl Write, id: NodeId, indent: &str) -> fmt::Result {
        let node = &self.tree[id];
        self.write_comment(out, node.comment())?;
        write!(out, "{indent}{}:", node.key())?;

        if node.is_flow_sequence() {
            let items = node
                .values()
                .map(|v| v.render(true))
                .collect::<Vec<_>>()
                .join(", ");
            if items.is_empty() {
                out.write_str(" []")?;
            } else {
                write!(out, " [ {items} ]")?;
            }
            out.write_str(node.inline_comment())?;
            return out.write_str(self.newline);
        }

        let count = node.value_count();
        if count >= 2 || (count == 1 && node.dash_items) {
            out.write_str(node.inline_comment())?;
            out.write_str(self.newline)?;
            let item_indent = if node.compact {
                indent.to_string()
            } else {
                format!("{indent}{}", self.tab)
            };
            for value in node.values() {
                self.write_item(out, value, &item_indent)?;
            }
            return Ok(());
        }

        if let Some(value) = node.value() {
            let rendered = value.render(false);
            if !rendered.is_empty() {
                write!(out, " {rendered}")?;
            }
            out.write_str(value.trailing_comment())?;
            return out.write_str(self.newline);
        }

        out.write_str(node.inline_comment())?;
        out.write_str(self.newline)?;
        let child_indent = format!("{indent}{}", self.tab);
        for child in node.child_ids() {
            self.write_node(out, child, &child_indent)?;
        }
        Ok(())
    }

    fn write_item(&self, out: &mut impl Write, value: &YamlValue, indent: &str) -> fmt::Result {
        self.write_comment(out, value.leading_comment())?;
        write!(out, "{indent}-")?;
        let rendered = value.render(false);
        if !rendered.is_empty() {
            write!(out, " {rendered}")?;
        }
        out.write_str(value.trailing_comment())?;
        out.write_str(self.newline)
    }

    // Comment blocks always end on a line break.
    fn write_comment(&self, out: &mut impl Write, comment: &str) -> fmt::Result {
        out.write_str(comment)?;
        if !comment.is_empty() && !comment.ends_with('\n') {
            out.write_str(self.newline)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reader::{read, ParseOptions};
    use pretty_assertions::assert_eq;

    fn round_trip(input: &str) -> miette::Result<String> {
        let out = read(input, ParseOptions::new())?;
        let mut result = String::new();
        Writer::new(&out.tree, out.indent, out.newline)
            .write_document(&mut result, &out.footer)
            .map_err(|e| miette::miette!("{e}"))?;
        Ok(result)
    }

    #[test]
    fn preserves_layout() -> miette::Result<()> {
        let input = r#"# Config
Language:
  Lang1: "text" # first
  'Lang 2': 'ext'

Data: [ data1, 'data 2' ] # inline
Empty: []
List:
- a
# about b
- b
Nested:
  Items:
    - x
    -
Single:
  - only
Section: # no values
  key: value
# footer
"#;
        assert_eq!(round_trip(input)?, input);
        Ok(())
    }

    #[test]
    fn creates_default_formatting() -> miette::Result<()> {
        let mut tree = YamlTree::new();
        let root = tree.root();
        let server = tree.add_child(root, "server")?;
        let host = tree.add_child(server, "host name")?;
        tree[host].set("local host")?;
        let ports = tree.add_child(server, "ports")?;
        tree[ports].set(vec!["80", "443"])?;
        let tags = tree.add_child(root, "tags")?;
        tree[tags].set(["a", "b,c"])?;

        let mut out = String::new();
        Writer::new(&tree, 2, "\n")
            .write_document(&mut out, "")
            .map_err(|e| miette::miette!("{e}"))?;
        assert_eq!(
            out,
            "server:\n  'host name': \"local host\"\n  ports:\n    - 80\n    - 443\ntags: [ a, \"b,c\" ]\n"
        );
        Ok(())
    }

    #[test]
    fn root_sequence() -> miette::Result<()> {
        assert_eq!(round_trip("- 1\n# two\n- 2\n")?, "- 1\n# two\n- 2\n");
        Ok(())
    }
}
