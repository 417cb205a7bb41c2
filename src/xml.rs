//! Owned XML tree for `ptools-xml` documents and the small path language
//! record schemas use to select values out of it.
//!
//! Nodes live in a single arena in document order, so a node's index doubles
//! as its position for ordering selection results.

use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::CycError;

type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    CData,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<NodeId>,
    },
    Text(String),
    CData(String),
}

#[derive(Debug, Clone)]
struct Slot {
    parent: Option<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Slot>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, CycError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut nodes: Vec<Slot> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(start) => {
                    let id = push_element(&mut nodes, stack.last().copied(), &start)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    push_element(&mut nodes, stack.last().copied(), &start)?;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(text) => {
                    if let Some(&parent) = stack.last() {
                        let value = text.unescape().map_err(xml_error)?.into_owned();
                        push_leaf(&mut nodes, parent, NodeData::Text(value));
                    }
                }
                Event::CData(data) => {
                    if let Some(&parent) = stack.last() {
                        let value = String::from_utf8(data.into_inner().into_owned())
                            .map_err(|err| CycError::Xml(err.to_string()))?;
                        push_leaf(&mut nodes, parent, NodeData::CData(value));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(CycError::Xml("unexpected end of document".to_string()));
        }
        if nodes.is_empty() {
            return Err(CycError::Xml("document has no root element".to_string()));
        }
        Ok(Self { nodes })
    }

    pub fn root(&self) -> Node<'_> {
        Node { doc: self, id: 0 }
    }
}

fn push_element(
    nodes: &mut Vec<Slot>,
    parent: Option<NodeId>,
    start: &BytesStart<'_>,
) -> Result<NodeId, CycError> {
    if parent.is_none() && !nodes.is_empty() {
        return Err(CycError::Xml("multiple root elements".to_string()));
    }
    let name = decode_name(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| CycError::Xml(err.to_string()))?;
        let key = decode_name(attr.key.as_ref())?;
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        attributes.push((key, value));
    }

    let id = nodes.len();
    nodes.push(Slot {
        parent,
        data: NodeData::Element {
            name,
            attributes,
            children: Vec::new(),
        },
    });
    if let Some(parent) = parent {
        attach(nodes, parent, id);
    }
    Ok(id)
}

fn push_leaf(nodes: &mut Vec<Slot>, parent: NodeId, data: NodeData) {
    let id = nodes.len();
    nodes.push(Slot {
        parent: Some(parent),
        data,
    });
    attach(nodes, parent, id);
}

fn attach(nodes: &mut [Slot], parent: NodeId, child: NodeId) {
    if let NodeData::Element { children, .. } = &mut nodes[parent].data {
        children.push(child);
    }
}

fn decode_name(bytes: &[u8]) -> Result<String, CycError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| CycError::Xml(err.to_string()))
}

fn xml_error(err: quick_xml::Error) -> CycError {
    CycError::Xml(err.to_string())
}

/// A borrowed handle to one node of a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Node<'a> {
    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.id].data
    }

    pub fn kind(&self) -> NodeKind {
        match self.data() {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::CData(_) => NodeKind::CData,
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn name(&self) -> Option<&'a str> {
        match self.data() {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self) -> &'a [(String, String)] {
        match self.data() {
            NodeData::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.doc.nodes[self.id].parent.map(|id| Node { doc: self.doc, id })
    }

    pub fn children(self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        let children: &'a [NodeId] = match self.data() {
            NodeData::Element { children, .. } => children,
            _ => &[],
        };
        children.iter().map(move |&id| Node { doc, id })
    }

    pub fn child_elements(self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.children().filter(Node::is_element)
    }

    /// Own text for text/CDATA nodes, concatenated descendant text for elements.
    pub fn text(&self) -> String {
        match self.data() {
            NodeData::Text(text) | NodeData::CData(text) => text.clone(),
            NodeData::Element { .. } => self.children().map(|child| child.text()).collect(),
        }
    }

    pub fn select(&self, selector: &Selector) -> Vec<Item<'a>> {
        selector.select(*self)
    }

    /// Short rendering used in diagnostics: the opening tag for elements.
    pub fn describe(&self) -> String {
        match self.data() {
            NodeData::Element {
                name, attributes, ..
            } => {
                let mut out = format!("<{name}");
                for (key, value) in attributes {
                    out.push_str(&format!(" {key}={value:?}"));
                }
                out.push('>');
                out
            }
            NodeData::Text(text) => format!("text {:?}", truncate(text)),
            NodeData::CData(text) => format!("CDATA {:?}", truncate(text)),
        }
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn truncate(text: &str) -> String {
    const LIMIT: usize = 40;
    match text.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// One selection result: a node, or an attribute of an element.
#[derive(Debug, Clone, Copy)]
pub enum Item<'a> {
    Node(Node<'a>),
    Attribute {
        owner: Node<'a>,
        index: usize,
        name: &'a str,
        value: &'a str,
    },
}

impl<'a> Item<'a> {
    pub fn as_element(&self) -> Option<Node<'a>> {
        match self {
            Item::Node(node) if node.is_element() => Some(*node),
            _ => None,
        }
    }

    /// The element an attribute belongs to, or a node's parent element.
    pub fn parent(&self) -> Option<Node<'a>> {
        match self {
            Item::Node(node) => node.parent(),
            Item::Attribute { owner, .. } => Some(*owner),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Item::Node(node) => node.describe(),
            Item::Attribute { owner, name, .. } => {
                format!("attribute @{name} of {}", owner.describe())
            }
        }
    }

    fn order_key(&self) -> (NodeId, usize) {
        match self {
            Item::Node(node) => (node.id, 0),
            Item::Attribute { owner, index, .. } => (owner.id, index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Current,
    Child {
        name: Option<String>,
        predicates: Vec<Predicate>,
    },
    Attribute(String),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    attribute: String,
    value: Option<String>,
}

impl Predicate {
    fn holds(&self, node: Node<'_>) -> bool {
        match (node.attribute(&self.attribute), &self.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl Step {
    fn apply<'a>(&self, item: Item<'a>, out: &mut Vec<Item<'a>>) {
        let Item::Node(node) = item else {
            return;
        };
        match self {
            Step::Current => out.push(item),
            Step::Child { name, predicates } => {
                out.extend(
                    node.child_elements()
                        .filter(|child| match name {
                            Some(name) => child.name() == Some(name.as_str()),
                            None => true,
                        })
                        .filter(|child| predicates.iter().all(|p| p.holds(*child)))
                        .map(Item::Node),
                );
            }
            Step::Attribute(wanted) => {
                for (index, (name, value)) in node.attributes().iter().enumerate() {
                    if name == wanted {
                        out.push(Item::Attribute {
                            owner: node,
                            index,
                            name,
                            value,
                        });
                    }
                }
            }
            Step::Text => out.extend(
                node.children()
                    .filter(|child| matches!(child.kind(), NodeKind::Text | NodeKind::CData))
                    .map(Item::Node),
            ),
        }
    }
}

/// A relative path expression: `a/b`, `*`, `@attr`, `text()`, `.`,
/// predicates `[@attr = 'v' and @other]`, and unions with `|`.
/// The empty selector selects the context node itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    paths: Vec<Vec<Step>>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, CycError> {
        let mut cursor = Cursor {
            source: source.trim(),
            pos: 0,
        };
        let mut paths = Vec::new();
        if !cursor.source.is_empty() {
            loop {
                paths.push(cursor.path()?);
                if !cursor.eat(b'|') {
                    break;
                }
            }
            cursor.skip_ws();
            if cursor.peek().is_some() {
                return Err(cursor.error("unexpected trailing input"));
            }
        }
        Ok(Self {
            source: source.trim().to_string(),
            paths,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn select<'a>(&self, context: Node<'a>) -> Vec<Item<'a>> {
        if self.paths.is_empty() {
            return vec![Item::Node(context)];
        }
        let mut selected = Vec::new();
        for path in &self.paths {
            let mut current = vec![Item::Node(context)];
            for step in path {
                let mut next = Vec::new();
                for item in current {
                    step.apply(item, &mut next);
                }
                current = next;
            }
            selected.extend(current);
        }
        if self.paths.len() > 1 {
            selected.sort_by_key(Item::order_key);
            selected.dedup_by_key(|item| item.order_key());
        }
        selected
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Cursor<'s> {
    source: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), CycError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected `{}`", expected as char)))
        }
    }

    fn name(&mut self) -> Option<&'s str> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| &self.source[start..self.pos])
    }

    fn quoted(&mut self) -> Result<&'s str, CycError> {
        self.skip_ws();
        let quote = match self.peek() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let value = &self.source[start..self.pos];
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated string"))
    }

    fn path(&mut self) -> Result<Vec<Step>, CycError> {
        let mut steps = vec![self.step()?];
        while self.eat(b'/') {
            steps.push(self.step()?);
        }
        Ok(steps)
    }

    fn step(&mut self) -> Result<Step, CycError> {
        if self.eat(b'@') {
            let name = self.name().ok_or_else(|| self.error("expected attribute name"))?;
            return Ok(Step::Attribute(name.to_string()));
        }
        if self.eat(b'.') {
            return Ok(Step::Current);
        }
        let name = if self.eat(b'*') {
            None
        } else {
            let name = self.name().ok_or_else(|| self.error("expected element name"))?;
            if name == "text" && self.eat(b'(') {
                self.expect(b')')?;
                return Ok(Step::Text);
            }
            Some(name.to_string())
        };
        let mut predicates = Vec::new();
        while self.eat(b'[') {
            loop {
                predicates.push(self.predicate()?);
                self.skip_ws();
                if self.source[self.pos..].starts_with("and") {
                    self.pos += 3;
                    continue;
                }
                break;
            }
            self.expect(b']')?;
        }
        Ok(Step::Child { name, predicates })
    }

    fn predicate(&mut self) -> Result<Predicate, CycError> {
        self.expect(b'@')?;
        let attribute = self
            .name()
            .ok_or_else(|| self.error("expected attribute name"))?
            .to_string();
        let value = if self.eat(b'=') {
            Some(self.quoted()?.to_string())
        } else {
            None
        };
        Ok(Predicate { attribute, value })
    }

    fn error(&self, reason: &str) -> CycError {
        CycError::InvalidSelector {
            selector: self.source.to_string(),
            reason: format!("{reason} at offset {}", self.pos),
        }
    }
}
