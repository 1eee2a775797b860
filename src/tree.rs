//! Immutable document tree shared by the validation stages and the domain parser.
//!
//! The tree is built once by the well-formedness stage and borrowed by the schema and
//! business-rule stages; nodes are addressable by id, so independent traversals never
//! contend for it.

use roxmltree::{Document, Node, ParsingOptions};

use crate::diagnostics::Locator;

/// A parsed document plus the counts gathered while building it
pub struct XmlTree<'input> {
    doc: Document<'input>,
    element_count: usize,
    attribute_count: usize,
}

impl<'input> XmlTree<'input> {
    pub fn parse(text: &'input str, allow_dtd: bool) -> Result<Self, roxmltree::Error> {
        let options = ParsingOptions {
            allow_dtd,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options)?;

        let (element_count, attribute_count) = doc
            .descendants()
            .filter(|node| node.is_element())
            .fold((0, 0), |(elements, attributes), node| {
                (elements + 1, attributes + node.attributes().count())
            });

        Ok(Self {
            doc,
            element_count,
            attribute_count,
        })
    }

    pub fn document(&self) -> &Document<'input> {
        &self.doc
    }

    pub fn root(&self) -> Node<'_, 'input> {
        self.doc.root_element()
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn attribute_count(&self) -> usize {
        self.attribute_count
    }
}

/// First element child with the given local name
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

/// Element children with the given local name, in document order
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

/// Trimmed text content of an element, `None` when blank
pub fn text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.text().map(str::trim).filter(|t| !t.is_empty())
}

/// Trimmed text of the first child element with the given name
pub fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(text)
}

/// Trimmed, non-blank attribute value
pub fn attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// A value that may be written as an attribute or as a child element
pub fn attribute_or_child<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    attribute(node, name).or_else(|| child_text(node, name))
}

/// Target of a `<transformationRef>`: its `ref` attribute, or its text content
pub fn reference<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    attribute(node, "ref").or_else(|| text(node))
}

/// Path-like locator: each step carries its 1-based index among same-named siblings
pub fn xpath(node: Node<'_, '_>) -> String {
    let mut steps: Vec<String> = node
        .ancestors()
        .filter(|n| n.is_element())
        .map(|n| {
            let name = n.tag_name().name();
            let index = n
                .prev_siblings()
                .filter(|s| s.is_element() && s.tag_name().name() == name)
                .count()
                + 1;
            format!("{}[{}]", name, index)
        })
        .collect();
    steps.reverse();

    let mut path = String::new();
    for step in steps {
        path.push('/');
        path.push_str(&step);
    }
    path
}

/// Locator for an element: xpath plus line and column of its start tag
pub fn locate(node: Node<'_, '_>) -> Locator {
    let pos = node.document().text_pos_at(node.range().start);
    Locator::at(xpath(node), pos.row, pos.col)
}

/// Locator for one attribute of an element
pub fn locate_attribute(node: Node<'_, '_>, name: &str) -> Locator {
    let mut locator = locate(node);
    locator.xpath = locator.xpath.map(|x| format!("{}/@{}", x, name));
    locator
}
