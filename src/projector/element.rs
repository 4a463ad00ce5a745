//! In-memory element the projector mutates

use std::collections::BTreeMap;
use std::fmt;

/// A single element: tag, attributes and flat content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    content: String,
    is_html: bool,
    children: Vec<Element>,
    removed: bool,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// Text or markup content, as last set
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_html(&self) -> bool {
        self.is_html
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = text.into();
        self.is_html = false;
    }

    pub fn set_html(&mut self, html: impl Into<String>) {
        self.content = html.into();
        self.is_html = true;
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn add_class(&mut self, class: &str) {
        if class.is_empty() || self.has_class(class) {
            return;
        }
        let mut classes = self.classes();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attribute("class", joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let remaining: Vec<&str> = self.classes().into_iter().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.attributes.remove("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attribute("class", joined);
        }
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Element] {
        &mut self.children
    }

    /// Whether a `remove` instruction deleted the element
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }

    /// `input` elements of type checkbox or radio
    pub fn is_checkable(&self) -> bool {
        self.tag.eq_ignore_ascii_case("input")
            && matches!(self.attribute("type"), Some("checkbox") | Some("radio"))
    }
}

fn escape(text: &str, quote: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialises as markup; removed elements render as an empty string
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.removed {
            return Ok(());
        }
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, escape(value, true))?;
        }
        write!(f, ">")?;
        if self.is_html {
            write!(f, "{}", self.content)?;
        } else {
            write!(f, "{}", escape(&self.content, false))?;
        }
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", self.tag)
    }
}
