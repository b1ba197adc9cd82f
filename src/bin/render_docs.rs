//! Renders the API documentation pages to markdown.
//!
//! With `--check`, templates are only linted and the exit status reports
//! whether any problem was found.

use anyhow::{Context, Result, bail};
use clap::Parser;
use drafts_api::config::{DEFAULT_API_SERVER_URL, LogFormat};
use drafts_api::docs::{PAGES, Renderer, SpecRegistry, Template, lint};
use drafts_api::middleware::init_tracing;
use std::path::PathBuf;
use tracing::info;

/// Expand documentation templates against the API's OpenAPI document
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Extra OpenAPI documents (JSON or YAML), registered under their file name
    #[arg(short, long = "spec")]
    specs: Vec<PathBuf>,

    /// Write rendered pages to this directory instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Lint only; exit with an error if any template has problems
    #[arg(long)]
    check: bool,

    /// Server URL used in code examples
    #[arg(long, env = "API_SERVER_URL", default_value = DEFAULT_API_SERVER_URL)]
    server_url: String,

    /// Templates to render; the bundled pages when omitted
    templates: Vec<PathBuf>,
}

fn load_templates(paths: &[PathBuf]) -> Result<Vec<Template>> {
    if paths.is_empty() {
        return PAGES
            .iter()
            .map(|page| Template::parse(page.slug, page.source).map_err(Into::into))
            .collect();
    }
    paths
        .iter()
        .map(|path| {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("template");
            Ok(Template::parse(name, &source)?)
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(LogFormat::Text)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let mut registry = SpecRegistry::with_api_doc()?;
    for spec in &cli.specs {
        let name = registry.load_file(spec)?;
        info!("Registered {} from {}", name, spec.display());
    }
    let renderer = Renderer::new(registry, &cli.server_url);
    let templates = load_templates(&cli.templates)?;

    if cli.check {
        let mut problems = 0;
        for template in &templates {
            for diagnostic in lint(template, &renderer) {
                eprintln!("{}", diagnostic);
                problems += 1;
            }
        }
        if problems > 0 {
            bail!("{} problem(s) found in {} template(s)", problems, templates.len());
        }
        info!("{} template(s) checked", templates.len());
        return Ok(());
    }

    if let Some(out) = &cli.out {
        std::fs::create_dir_all(out)
            .with_context(|| format!("Failed to create {}", out.display()))?;
    }
    for template in &templates {
        let rendered = renderer.render(template)?;
        match &cli.out {
            Some(out) => {
                let path = out.join(format!("{}.md", template.name));
                std::fs::write(&path, rendered)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote {}", path.display());
            }
            None => print!("{}", rendered),
        }
    }
    Ok(())
}
