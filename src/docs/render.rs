//! Expansion of documentation templates into markdown.

use super::DocsError;
use super::macros::{Endpoint, MacroCall};
use super::pages;
use super::spec::{Operation, SpecRegistry};
use super::template::{Node, Template};
use serde_json::Value;
use tracing::debug;

/// Languages `generate_code_example(LANG)` can produce.
pub const CODE_EXAMPLE_LANGUAGES: &[&str] = &["curl", "python"];

/// Fields every response carries; the return values list leaves them out.
const ENVELOPE_FIELDS: &[&str] = &["result", "msg"];

const NO_ARGUMENTS: &str = "This endpoint does not accept any parameters.";
const NO_RETURN_VALUES: &str = "This endpoint does not return any additional values.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgumentLocation {
    Path,
    Query,
    Body,
}

/// A request parameter, wherever it is sent.
#[derive(Debug, Clone)]
struct Argument {
    name: String,
    location: ArgumentLocation,
    required: bool,
    description: String,
    example: Option<Value>,
}

pub struct Renderer {
    registry: SpecRegistry,
    server_url: String,
}

impl Renderer {
    /// `server_url` is the API root used in code examples, such as
    /// `http://localhost:8081/api/v1`.
    pub fn new(registry: SpecRegistry, server_url: &str) -> Self {
        Self {
            registry,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn registry(&self) -> &SpecRegistry {
        &self.registry
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Render a bundled page by slug.
    pub fn render_page(&self, slug: &str) -> Result<String, DocsError> {
        let page = pages::find(slug).ok_or_else(|| DocsError::UnknownPage(slug.to_string()))?;
        self.render_source(page.slug, page.source)
    }

    pub fn render_source(&self, name: &str, source: &str) -> Result<String, DocsError> {
        let template = Template::parse(name, source)?;
        self.render(&template)
    }

    pub fn render(&self, template: &Template) -> Result<String, DocsError> {
        let tabs_error = |line: usize, message: &str| DocsError::Tabs {
            template: template.name.clone(),
            line,
            message: message.to_string(),
        };

        let mut out: Vec<String> = Vec::new();
        let mut nodes = template.nodes.iter();
        while let Some(node) = nodes.next() {
            match node {
                Node::Text(text) => out.push(text.clone()),
                Node::Macro {
                    line,
                    call: MacroCall::StartTabs,
                } => {
                    let mut group = Vec::new();
                    let mut closed = false;
                    for inner in nodes.by_ref() {
                        match inner {
                            Node::Macro {
                                call: MacroCall::EndTabs,
                                ..
                            } => {
                                closed = true;
                                break;
                            }
                            Node::Macro {
                                line,
                                call: MacroCall::StartTabs,
                            } => return Err(tabs_error(*line, "{start_tabs} cannot be nested")),
                            other => group.push(other),
                        }
                    }
                    if !closed {
                        return Err(tabs_error(*line, "{start_tabs} is never closed"));
                    }
                    out.push(self.render_tab_group(template, &group)?);
                }
                Node::Macro {
                    line,
                    call: MacroCall::EndTabs,
                } => {
                    return Err(tabs_error(
                        *line,
                        "{end_tabs} without a matching {start_tabs}",
                    ));
                }
                Node::Macro {
                    line,
                    call: MacroCall::Tab { .. },
                } => return Err(tabs_error(*line, "{tab|...} outside of a tab group")),
                Node::Macro { call, .. } => out.push(self.expand(call)?),
            }
        }

        debug!("Rendered documentation page {}", template.name);
        let mut rendered = out.join("\n");
        rendered.push('\n');
        Ok(rendered)
    }

    /// Expand a single content macro. Tab markers only have meaning inside
    /// `render`, and expand to nothing here.
    pub fn expand(&self, call: &MacroCall) -> Result<String, DocsError> {
        match call {
            MacroCall::ApiDescription { endpoint } => {
                let operation = self.registry.operation(None, endpoint)?;
                Ok(operation.description().unwrap_or_default().trim().to_string())
            }
            MacroCall::CodeExample { language, endpoint } => {
                let operation = self.registry.operation(None, endpoint)?;
                match language.as_str() {
                    "curl" => Ok(self.curl_example(&operation, endpoint)),
                    "python" => Ok(python_example(&operation, endpoint)),
                    _ => Err(DocsError::UnsupportedLanguage {
                        language: language.clone(),
                        endpoint: endpoint.to_string(),
                    }),
                }
            }
            MacroCall::Fixture { endpoint, status } => {
                let operation = self.registry.operation(None, endpoint)?;
                let example = operation
                    .response_content(*status)
                    .and_then(|content| content.get("example"))
                    .ok_or_else(|| DocsError::UnknownFixture {
                        endpoint: endpoint.to_string(),
                        status: *status,
                    })?;
                let pretty = serde_json::to_string_pretty(example).map_err(|e| {
                    DocsError::Load {
                        path: endpoint.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(format!("```json\n{}\n```", pretty))
            }
            MacroCall::ArgumentsTable {
                spec_file,
                endpoint,
            } => {
                let operation = self.registry.operation(Some(spec_file), endpoint)?;
                Ok(arguments_table(&operation))
            }
            MacroCall::ReturnValuesTable {
                spec_file,
                endpoint,
            } => {
                let operation = self.registry.operation(Some(spec_file), endpoint)?;
                return_values(&operation, endpoint)
            }
            MacroCall::StartTabs | MacroCall::Tab { .. } | MacroCall::EndTabs => Ok(String::new()),
        }
    }

    fn render_tab_group(&self, template: &Template, group: &[&Node]) -> Result<String, DocsError> {
        let explicit = group.iter().any(|node| {
            matches!(
                node,
                Node::Macro {
                    call: MacroCall::Tab { .. },
                    ..
                }
            )
        });

        let mut tabs: Vec<(String, Vec<&Node>)> = Vec::new();
        let mut leading: Vec<&Node> = Vec::new();
        for node in group {
            match node {
                Node::Macro {
                    line,
                    call: MacroCall::Tab { name },
                } => {
                    if tabs.iter().any(|(existing, _)| existing == name) {
                        return Err(DocsError::Tabs {
                            template: template.name.clone(),
                            line: *line,
                            message: format!("Duplicate tab \"{}\"", name),
                        });
                    }
                    tabs.push((name.clone(), Vec::new()));
                }
                Node::Macro {
                    call: MacroCall::CodeExample { language, .. },
                    ..
                } if !explicit => tabs.push((language.clone(), vec![*node])),
                _ => match tabs.last_mut() {
                    Some((_, body)) => body.push(*node),
                    None => leading.push(*node),
                },
            }
        }

        if tabs.is_empty() {
            tabs.push(("instructions".to_string(), Vec::new()));
        }
        if let Some((_, first)) = tabs.first_mut() {
            let mut body = leading;
            body.append(first);
            *first = body;
        }

        let mut html = vec![
            "<div class=\"code-section\" markdown=\"1\">".to_string(),
            "<ul class=\"nav\">".to_string(),
        ];
        for (key, _) in &tabs {
            html.push(format!(
                "<li data-tab-key=\"{}\" tabindex=\"0\">{}</li>",
                key,
                tab_label(key)
            ));
        }
        html.push("</ul>".to_string());
        html.push("<div class=\"blocks\">".to_string());
        for (key, body) in &tabs {
            let mut lines = Vec::new();
            for node in body {
                match node {
                    Node::Text(text) => lines.push(text.clone()),
                    Node::Macro { call, .. } => lines.push(self.expand(call)?),
                }
            }
            html.push(String::new());
            html.push(format!("<div data-tab-key=\"{}\" markdown=\"1\">", key));
            html.push(String::new());
            html.push(trim_blank_lines(&lines));
            html.push(String::new());
            html.push("</div>".to_string());
        }
        html.push(String::new());
        html.push("</div>".to_string());
        html.push("</div>".to_string());
        Ok(html.join("\n"))
    }

    fn curl_example(&self, operation: &Operation<'_>, endpoint: &Endpoint) -> String {
        let arguments = arguments(operation);
        let method = endpoint.method.to_uppercase();
        let get_flag = if method == "GET" { " -G" } else { "" };

        let mut lines = vec![format!(
            "curl -sSX {}{} {}{}",
            method,
            get_flag,
            self.server_url,
            substitute_path(&endpoint.path, &arguments)
        )];
        lines.push("-u BOT_EMAIL_ADDRESS:BOT_API_KEY".to_string());
        for argument in arguments
            .iter()
            .filter(|a| a.location != ArgumentLocation::Path)
        {
            if let Some(example) = &argument.example {
                lines.push(format!(
                    "--data-urlencode {}",
                    shell_quote(&format!("{}={}", argument.name, example_text(example)))
                ));
            }
        }
        format!("```curl\n{}\n```", lines.join(" \\\n    "))
    }
}

fn python_example(operation: &Operation<'_>, endpoint: &Endpoint) -> String {
    let arguments = arguments(operation);
    let mut lines = vec![
        "#!/usr/bin/env python3".to_string(),
        String::new(),
        "import zulip".to_string(),
        String::new(),
        "# Pass the path to your zuliprc file here.".to_string(),
        "client = zulip.Client(config_file=\"~/zuliprc\")".to_string(),
        String::new(),
    ];

    let request: Vec<&Argument> = arguments
        .iter()
        .filter(|a| a.location != ArgumentLocation::Path && a.example.is_some())
        .collect();
    let call_args = format!(
        "url=\"{}\", method=\"{}\"",
        substitute_path(&endpoint.path, &arguments),
        endpoint.method.to_uppercase()
    );
    if request.is_empty() {
        lines.push(format!("result = client.call_endpoint({})", call_args));
    } else {
        lines.push("request = {".to_string());
        for argument in request {
            if let Some(example) = &argument.example {
                lines.push(format!(
                    "    \"{}\": {},",
                    argument.name,
                    python_literal(example)
                ));
            }
        }
        lines.push("}".to_string());
        lines.push(format!(
            "result = client.call_endpoint({}, request=request)",
            call_args
        ));
    }
    lines.push("print(result)".to_string());
    format!("```python\n{}\n```", lines.join("\n"))
}

fn arguments(operation: &Operation<'_>) -> Vec<Argument> {
    let mut found = Vec::new();
    for parameter in operation.parameters() {
        let location = match parameter.get("in").and_then(Value::as_str) {
            Some("path") => ArgumentLocation::Path,
            Some("query") => ArgumentLocation::Query,
            _ => continue,
        };
        let schema = parameter.get("schema").map(|s| operation.resolve(s));
        found.push(Argument {
            name: str_field(parameter, "name"),
            location,
            required: parameter
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(location == ArgumentLocation::Path),
            description: str_field(parameter, "description"),
            example: parameter
                .get("example")
                .or_else(|| schema.and_then(|s| s.get("example")))
                .cloned(),
        });
    }

    if let Some(body) = operation.request_body_schema() {
        let required: Vec<&str> = body
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if let Some(properties) = body.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let property = schema_of(operation, property);
                found.push(Argument {
                    name: name.clone(),
                    location: ArgumentLocation::Body,
                    required: operation.request_body_required() && required.contains(&name.as_str()),
                    description: str_field(property, "description"),
                    example: property.get("example").cloned(),
                });
            }
        }
    }
    found
}

fn arguments_table(operation: &Operation<'_>) -> String {
    let arguments = arguments(operation);
    if arguments.is_empty() {
        return NO_ARGUMENTS.to_string();
    }
    let mut lines = vec![
        "| Argument | Example | Required | Description |".to_string(),
        "|---|---|---|---|".to_string(),
    ];
    for argument in &arguments {
        let example = argument
            .example
            .as_ref()
            .map(|e| format!("`{}`", table_cell(&example_text(e))))
            .unwrap_or_default();
        lines.push(format!(
            "| `{}` | {} | {} | {} |",
            argument.name,
            example,
            if argument.required { "Yes" } else { "No" },
            table_cell(&argument.description)
        ));
    }
    lines.join("\n")
}

fn return_values(operation: &Operation<'_>, endpoint: &Endpoint) -> Result<String, DocsError> {
    let content = operation
        .response_content(200)
        .ok_or_else(|| DocsError::UnknownFixture {
            endpoint: endpoint.to_string(),
            status: 200,
        })?;
    let mut lines = Vec::new();
    if let Some(schema) = content.get("schema") {
        let mut seen: Vec<&str> = schema_ref(schema).into_iter().collect();
        describe_properties(
            operation,
            schema_of(operation, schema),
            0,
            &mut seen,
            &mut lines,
        );
    }
    if lines.is_empty() {
        return Ok(NO_RETURN_VALUES.to_string());
    }
    Ok(lines.join("\n"))
}

/// `seen` holds the `$ref`s of the schemas being described, outermost
/// first. A property pointing back at one of them is listed but not
/// expanded.
fn describe_properties<'a>(
    operation: &Operation<'a>,
    schema: &'a Value,
    depth: usize,
    seen: &mut Vec<&'a str>,
    lines: &mut Vec<String>,
) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    let indent = "    ".repeat(depth);
    for (name, raw) in properties {
        if depth == 0 && ENVELOPE_FIELDS.contains(&name.as_str()) {
            continue;
        }
        let reference = schema_ref(raw);
        if reference.is_some_and(|r| seen.contains(&r)) {
            lines.push(format!("{}* `{}`: object (recursive)", indent, name));
            continue;
        }
        seen.extend(reference);

        let property = schema_of(operation, raw);
        let description = str_field(property, "description");
        let label = type_label(operation, property, seen);
        if description.is_empty() {
            lines.push(format!("{}* `{}`: {}", indent, name, label));
        } else {
            lines.push(format!(
                "{}* `{}`: {} - {}",
                indent,
                name,
                label,
                description.replace('\n', " ")
            ));
        }

        match property.get("items") {
            Some(items) => {
                let item_ref = schema_ref(items);
                if !item_ref.is_some_and(|r| seen.contains(&r)) {
                    seen.extend(item_ref);
                    let nested = schema_of(operation, items);
                    describe_properties(operation, nested, depth + 1, seen, lines);
                    if item_ref.is_some() {
                        seen.pop();
                    }
                }
            }
            None => describe_properties(operation, property, depth + 1, seen, lines),
        }

        if reference.is_some() {
            seen.pop();
        }
    }
}

/// The `$ref` a schema points at, looking through a single-member `allOf`.
fn schema_ref(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str).or_else(|| {
        match value.get("allOf").and_then(Value::as_array) {
            Some(members) if members.len() == 1 => members[0].get("$ref").and_then(Value::as_str),
            _ => None,
        }
    })
}

/// Resolve references and unwrap the single-member `allOf` used for
/// optional nested schemas.
fn schema_of<'a>(operation: &Operation<'a>, value: &'a Value) -> &'a Value {
    let resolved = operation.resolve(value);
    match resolved.get("allOf").and_then(Value::as_array) {
        Some(members) if members.len() == 1 => operation.resolve(&members[0]),
        _ => resolved,
    }
}

fn type_label<'a>(operation: &Operation<'a>, schema: &'a Value, seen: &mut Vec<&'a str>) -> String {
    let base = match schema.get("type").and_then(Value::as_str) {
        Some("array") => {
            let item = match schema.get("items") {
                Some(items) => match schema_ref(items) {
                    Some(r) if seen.contains(&r) => "object".to_string(),
                    item_ref => {
                        seen.extend(item_ref);
                        let label = type_label(operation, schema_of(operation, items), seen);
                        if item_ref.is_some() {
                            seen.pop();
                        }
                        label
                    }
                },
                None => "object".to_string(),
            };
            format!("({})[]", item)
        }
        Some(other) => other.to_string(),
        None if schema.get("properties").is_some() => "object".to_string(),
        None => "any".to_string(),
    };
    if schema.get("nullable").and_then(Value::as_bool) == Some(true) {
        format!("{} | null", base)
    } else {
        base
    }
}

fn substitute_path(path: &str, arguments: &[Argument]) -> String {
    arguments
        .iter()
        .filter(|a| a.location == ArgumentLocation::Path)
        .fold(path.to_string(), |path, argument| match &argument.example {
            Some(example) => path.replace(
                &format!("{{{}}}", argument.name),
                &example_text(example),
            ),
            None => path,
        })
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Strings are shown as-is; anything else as compact JSON, which is how
/// JSON-valued form parameters are sent.
fn example_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn table_cell(text: &str) -> String {
    text.replace('\n', " ").replace('|', "\\|")
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(_) => value.to_string(),
        Value::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(python_literal)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), python_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn tab_label(key: &str) -> String {
    match key {
        "curl" => "curl".to_string(),
        "python" => "Python".to_string(),
        "js" | "javascript" => "JavaScript".to_string(),
        other => {
            let words = other.replace(['-', '_'], " ");
            let mut chars = words.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

fn trim_blank_lines(lines: &[String]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
