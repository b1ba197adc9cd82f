//! Authoring checks for documentation templates.

use super::macros::MacroCall;
use super::render::Renderer;
use super::template::Template;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub template: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.template, self.line, self.message)
    }
}

/// Report every problem in `template` instead of stopping at the first.
///
/// Content macros are checked by expanding them with `renderer`, so a
/// template that lints clean also renders.
pub fn lint(template: &Template, renderer: &Renderer) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut report = |line: usize, message: String| {
        diagnostics.push(Diagnostic {
            template: template.name.clone(),
            line,
            message,
        });
    };

    // Line of the open {start_tabs} and the tab names seen in that group.
    let mut open_group: Option<(usize, BTreeSet<String>)> = None;
    for (line, call) in template.macros() {
        match call {
            MacroCall::StartTabs => {
                if let Some((opened, _)) = &open_group {
                    report(
                        line,
                        format!("{{start_tabs}} nested inside the group opened on line {}", opened),
                    );
                } else {
                    open_group = Some((line, BTreeSet::new()));
                }
            }
            MacroCall::EndTabs => {
                if open_group.take().is_none() {
                    report(line, "{end_tabs} without a matching {start_tabs}".to_string());
                }
            }
            MacroCall::Tab { name } => match &mut open_group {
                Some((_, names)) => {
                    if !names.insert(name.clone()) {
                        report(line, format!("Duplicate tab \"{}\" in tab group", name));
                    }
                }
                None => report(line, format!("{{tab|{}}} outside of a tab group", name)),
            },
            other => {
                if let Err(e) = renderer.expand(other) {
                    report(line, e.to_string());
                }
            }
        }
    }
    if let Some((opened, _)) = open_group {
        report(opened, "{start_tabs} is never closed".to_string());
    }

    diagnostics
}
