//! Macro grammar for documentation templates.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

const HTTP_METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

static API_DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^generate_api_description\((?P<endpoint>.+)\)$").unwrap());
static CODE_EXAMPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^generate_code_example\((?P<language>[\w-]+)\)\|(?P<endpoint>[^|]+)\|example$")
        .unwrap()
});
static FIXTURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^generate_code_example\|(?P<endpoint>[^|]+)\|fixture\((?P<status>\d{3})\)$")
        .unwrap()
});
static ARGUMENTS_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^generate_api_arguments_table\|(?P<spec>[^|]+)\|(?P<endpoint>[^|]+)$").unwrap()
});
static RETURN_VALUES_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^generate_return_values_table\|(?P<spec>[^|]+)\|(?P<endpoint>[^|]+)$").unwrap()
});
static TAB: Lazy<Regex> = Lazy::new(|| Regex::new(r"^tab\|(?P<name>[\w-]+)$").unwrap());

/// Prefixes that mark a `{...}` line as a macro rather than literal text.
const MACRO_PREFIXES: &[&str] = &[
    "generate_api_description",
    "generate_code_example",
    "generate_api_arguments_table",
    "generate_return_values_table",
    "start_tabs",
    "end_tabs",
    "tab|",
];

/// An API operation, written `PATH:METHOD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub path: String,
    /// Lowercase HTTP method
    pub method: String,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (path, method) = raw
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| format!("Endpoint \"{}\" is not of the form PATH:METHOD", raw))?;
        let method = method.to_ascii_lowercase();
        if !HTTP_METHODS.contains(&method.as_str()) {
            return Err(format!("Unknown HTTP method \"{}\" in \"{}\"", method, raw));
        }
        if !path.starts_with('/') {
            return Err(format!("Endpoint path \"{}\" must start with /", path));
        }
        Ok(Self {
            path: path.to_string(),
            method,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.method)
    }
}

/// A parsed template macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroCall {
    ApiDescription {
        endpoint: Endpoint,
    },
    CodeExample {
        language: String,
        endpoint: Endpoint,
    },
    Fixture {
        endpoint: Endpoint,
        status: u16,
    },
    ArgumentsTable {
        spec_file: String,
        endpoint: Endpoint,
    },
    ReturnValuesTable {
        spec_file: String,
        endpoint: Endpoint,
    },
    StartTabs,
    Tab {
        name: String,
    },
    EndTabs,
}

impl MacroCall {
    /// Whether the inside of a `{...}` line names a macro.
    pub fn looks_like_macro(body: &str) -> bool {
        MACRO_PREFIXES.iter().any(|prefix| body.starts_with(prefix))
    }

    /// Parse the inside of a `{...}` line.
    pub fn parse(body: &str) -> Result<Self, String> {
        let body = body.trim();
        match body {
            "start_tabs" => return Ok(Self::StartTabs),
            "end_tabs" => return Ok(Self::EndTabs),
            _ => {}
        }

        if let Some(caps) = TAB.captures(body) {
            return Ok(Self::Tab {
                name: caps["name"].to_string(),
            });
        }
        if let Some(caps) = API_DESCRIPTION.captures(body) {
            return Ok(Self::ApiDescription {
                endpoint: Endpoint::parse(&caps["endpoint"])?,
            });
        }
        if let Some(caps) = CODE_EXAMPLE.captures(body) {
            return Ok(Self::CodeExample {
                language: caps["language"].to_string(),
                endpoint: Endpoint::parse(&caps["endpoint"])?,
            });
        }
        if let Some(caps) = FIXTURE.captures(body) {
            let status = caps["status"]
                .parse()
                .map_err(|_| format!("Invalid status code in \"{}\"", body))?;
            return Ok(Self::Fixture {
                endpoint: Endpoint::parse(&caps["endpoint"])?,
                status,
            });
        }
        if let Some(caps) = ARGUMENTS_TABLE.captures(body) {
            return Ok(Self::ArgumentsTable {
                spec_file: caps["spec"].to_string(),
                endpoint: Endpoint::parse(&caps["endpoint"])?,
            });
        }
        if let Some(caps) = RETURN_VALUES_TABLE.captures(body) {
            return Ok(Self::ReturnValuesTable {
                spec_file: caps["spec"].to_string(),
                endpoint: Endpoint::parse(&caps["endpoint"])?,
            });
        }
        Err(format!("Malformed macro {{{}}}", body))
    }

    /// The endpoint a macro documents, if it refers to one.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            Self::ApiDescription { endpoint }
            | Self::CodeExample { endpoint, .. }
            | Self::Fixture { endpoint, .. }
            | Self::ArgumentsTable { endpoint, .. }
            | Self::ReturnValuesTable { endpoint, .. } => Some(endpoint),
            Self::StartTabs | Self::Tab { .. } | Self::EndTabs => None,
        }
    }
}
