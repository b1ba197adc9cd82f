//! Parsing of markdown templates into text lines and macro calls.

use super::DocsError;
use super::macros::MacroCall;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A literal markdown line
    Text(String),
    Macro { line: usize, call: MacroCall },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub nodes: Vec<Node>,
}

impl Template {
    /// Parse `source`. A line is a macro when, once trimmed, it is wrapped
    /// in braces and starts with a macro name; anything else is kept as text
    /// so JSON objects inside code blocks pass through untouched.
    pub fn parse(name: &str, source: &str) -> Result<Self, DocsError> {
        let mut nodes = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let trimmed = raw.trim();
            let body = trimmed
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'));
            match body {
                Some(body) if MacroCall::looks_like_macro(body) => {
                    let call = MacroCall::parse(body).map_err(|message| DocsError::Syntax {
                        template: name.to_string(),
                        line: index + 1,
                        message,
                    })?;
                    nodes.push(Node::Macro {
                        line: index + 1,
                        call,
                    });
                }
                _ => nodes.push(Node::Text(raw.to_string())),
            }
        }
        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }

    pub fn macros(&self) -> impl Iterator<Item = (usize, &MacroCall)> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Macro { line, call } => Some((*line, call)),
            Node::Text(_) => None,
        })
    }
}
