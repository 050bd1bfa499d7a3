//! Minimal CSS selector matching for the in-memory page
//!
//! Covers exactly the grammar the selector registry uses: tag names,
//! classes, attribute presence / equality / substring tests, compound
//! simple selectors, and the descendant combinator. Anything outside
//! that grammar fails to parse.

/// Snapshot of the matchable facts about one node.
#[derive(Debug, Clone)]
pub(crate) struct NodeFacts {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl NodeFacts {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
}

#[derive(Debug, Clone)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrTest {
    fn parse(body: &str) -> Option<AttrTest> {
        if let Some((name, value)) = body.split_once("*=") {
            return Some(AttrTest {
                name: name.trim().to_string(),
                op: AttrOp::Contains,
                value: unquote(value),
            });
        }
        if let Some((name, value)) = body.split_once('=') {
            return Some(AttrTest {
                name: name.trim().to_string(),
                op: AttrOp::Equals,
                value: unquote(value),
            });
        }
        let name = body.trim();
        if name.is_empty() {
            return None;
        }
        Some(AttrTest {
            name: name.to_string(),
            op: AttrOp::Exists,
            value: String::new(),
        })
    }

    fn matches(&self, node: &NodeFacts) -> bool {
        let Some(actual) = node.attr(&self.name) else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Contains => actual.contains(&self.value),
        }
    }
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
        })
        .unwrap_or(trimmed)
        .to_string()
}

/// One simple selector: optional tag plus class and attribute tests.
#[derive(Debug, Clone)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn parse(input: &str) -> Option<Compound> {
        let mut chars = input.chars().peekable();
        let mut compound = Compound {
            tag: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        };

        let mut tag = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                tag.push(c);
                chars.next();
            } else {
                break;
            }
        }
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }

        while let Some(&c) = chars.peek() {
            match c {
                '.' => {
                    chars.next();
                    let mut class = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                            class.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if class.is_empty() {
                        return None;
                    }
                    compound.classes.push(class);
                }
                '[' => {
                    chars.next();
                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed {
                        return None;
                    }
                    compound.attrs.push(AttrTest::parse(&body)?);
                }
                _ => return None,
            }
        }

        if compound.tag.is_none() && compound.classes.is_empty() && compound.attrs.is_empty() {
            return None;
        }
        Some(compound)
    }

    fn matches(&self, node: &NodeFacts) -> bool {
        if let Some(tag) = &self.tag {
            if node.tag != *tag {
                return false;
            }
        }
        if !self.classes.iter().all(|class| node.has_class(class)) {
            return false;
        }
        self.attrs.iter().all(|test| test.matches(node))
    }
}

/// Parsed selector: a chain of compounds joined by descendant
/// combinators, last compound being the subject.
#[derive(Debug, Clone)]
pub(crate) struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Option<Selector> {
        let parts = split_descendants(input);
        if parts.is_empty() {
            return None;
        }
        let compounds = parts
            .iter()
            .map(|part| Compound::parse(part))
            .collect::<Option<Vec<_>>>()?;
        Some(Selector { compounds })
    }

    /// Tests the last node of `path` against the subject compound, with
    /// the rest of the path as its ancestor chain (root first).
    pub fn matches(&self, path: &[NodeFacts]) -> bool {
        let Some((subject, ancestors)) = path.split_last() else {
            return false;
        };
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(subject) {
            return false;
        }

        // Remaining compounds must match successively closer-to-root
        // ancestors, scanning outward from the subject.
        let mut idx = ancestors.len();
        for compound in rest.iter().rev() {
            let mut found = false;
            while idx > 0 {
                idx -= 1;
                if compound.matches(&ancestors[idx]) {
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
        }
        true
    }
}

/// Splits on whitespace outside attribute brackets.
fn split_descendants(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in input.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
