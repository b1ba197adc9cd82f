//! API documentation pipeline.
//!
//! Documentation pages are markdown templates. Lines consisting of a single
//! `{...}` macro are expanded from the OpenAPI document:
//!
//! | Macro | Expands to |
//! |---|---|
//! | `{generate_api_description(ENDPOINT)}` | the operation's description |
//! | `{generate_code_example(LANG)\|ENDPOINT\|example}` | a runnable request example |
//! | `{generate_code_example\|ENDPOINT\|fixture(STATUS)}` | the example response body |
//! | `{generate_api_arguments_table\|SPEC_FILE\|ENDPOINT}` | a table of parameters |
//! | `{generate_return_values_table\|SPEC_FILE\|ENDPOINT}` | the response fields |
//! | `{start_tabs}` `{tab\|NAME}` `{end_tabs}` | a tabbed group of alternatives |
//!
//! `ENDPOINT` is written `PATH:METHOD`, for example `/drafts:get`.

pub mod lint;
pub mod macros;
pub mod pages;
pub mod render;
pub mod spec;
pub mod template;

pub use lint::{Diagnostic, lint};
pub use macros::{Endpoint, MacroCall};
pub use pages::{PAGES, Page};
pub use render::Renderer;
pub use spec::SpecRegistry;
pub use template::{Node, Template};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocsError {
    #[error("{template}:{line}: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },
    #[error("{template}:{line}: {message}")]
    Tabs {
        template: String,
        line: usize,
        message: String,
    },
    #[error("Unknown spec file: {0}")]
    UnknownSpecFile(String),
    #[error("Endpoint {0} is not defined in the API spec")]
    UnknownEndpoint(String),
    #[error("Endpoint {endpoint} has no example response for status {status}")]
    UnknownFixture { endpoint: String, status: u16 },
    #[error("No {language} code example is available for {endpoint}")]
    UnsupportedLanguage { language: String, endpoint: String },
    #[error("Unknown documentation page: {0}")]
    UnknownPage(String),
    #[error("Failed to load {path}: {message}")]
    Load { path: String, message: String },
}
