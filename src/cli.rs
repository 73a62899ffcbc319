//! Command-line surface: generate Elm modules, or decode a response with one.
use std::path::{Component, Path, PathBuf};
use std::process::Command as Process;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::naming::module_name_for;
use crate::runtime::Runtime;
use crate::schema::Schema;
use crate::translate::{query_to_elm, translate_document, GenerateOptions, HttpMethod};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate typed Elm clients from GraphQL queries
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// translate .graphql files into .elm modules next to them
    Generate(GenerateOut),
    /// decode a JSON response with the decoder generated for a query
    Decode(DecodeOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// introspection JSON (.json) or SDL schema file
    #[arg(long)]
    schema: PathBuf,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// GraphQL endpoint baked into `endpointUrl`
    #[arg(long)]
    endpoint: String,

    /// HTTP verb for queries
    #[arg(long, value_enum, default_value_t = HttpMethod::Get)]
    method: HttpMethod,

    /// wrap responses in `GraphQLSpec.Response`
    #[arg(long)]
    error_spec: bool,

    /// .graphql paths or quoted glob patterns; discovered from elm.json when omitted
    #[arg(long, short, num_args = 1..)]
    input: Vec<String>,

    /// run `elm-format --yes` on every generated module
    #[arg(long)]
    format: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct DecodeOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// .graphql file with the operation
    #[arg(long)]
    query: PathBuf,

    /// JSON response file
    #[arg(long)]
    response: PathBuf,

    /// operation to decode with (first operation if omitted)
    #[arg(long)]
    operation: Option<String>,

    /// JSON Pointer to the decoder input within the response
    #[arg(long, default_value = "/data")]
    json_pointer: String,
}

/// The part of `elm.json` / `elm-package.json` used for discovery.
#[derive(Debug, Deserialize)]
struct ElmProject {
    #[serde(rename = "source-directories", default = "default_source_directories")]
    source_directories: Vec<String>,
}

const PROJECT_FILES: [&str; 2] = ["elm-package.json", "elm.json"];

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> anyhow::Result<Schema> {
        Schema::load(&self.schema)
            .with_context(|| format!("failed to load schema {}", self.schema.display()))
    }
}

impl GenerateOut {
    fn options_for(&self, source_path: &Path) -> GenerateOptions {
        let mut options = GenerateOptions::new(module_name_for(source_path), &self.endpoint);
        options.method = self.method;
        options.error_spec = self.error_spec;
        options
    }

    fn sources(&self) -> anyhow::Result<Vec<PathBuf>> {
        if self.input.is_empty() {
            discover_sources(Path::new("."))
        } else {
            resolve_file_path_patterns(&self.input)
        }
    }

    /// Writes `X.elm` beside `X.graphql` once the module rendered.
    fn generate_file(&self, schema: &Schema, source_path: &Path) -> anyhow::Result<PathBuf> {
        let source = std::fs::read_to_string(source_path)
            .with_context(|| format!("failed to read {}", source_path.display()))?;
        let options = self.options_for(source_path);
        let elm_src = query_to_elm(&source, schema, &options)
            .with_context(|| format!("failed to translate {}", source_path.display()))?;
        let out = source_path.with_extension("elm");
        std::fs::write(&out, &elm_src)
            .with_context(|| format!("failed to write {}", out.display()))?;
        info!(module = %options.module_name, out = %out.display(), "generated");
        if self.format {
            run_elm_format(&out);
        }
        Ok(out)
    }

    fn run(&self) -> anyhow::Result<()> {
        let schema = self.schema_settings.load()?;
        let sources = self.sources()?;
        let generated = sources
            .par_iter()
            .map(|source_path| self.generate_file(&schema, source_path))
            .collect::<anyhow::Result<Vec<_>>>()?;

        for out in &generated {
            eprintln!("  {} {}", "wrote".green(), out.display());
        }
        eprintln!(
            "{} {} Elm module(s) generated",
            "✓".green().bold(),
            generated.len()
        );
        Ok(())
    }
}

impl DecodeOut {
    fn run(&self) -> anyhow::Result<()> {
        let schema = self.schema_settings.load()?;
        let source = std::fs::read_to_string(&self.query)
            .with_context(|| format!("failed to read {}", self.query.display()))?;
        let document = async_graphql_parser::parse_query(&source)
            .with_context(|| format!("failed to parse {}", self.query.display()))?;
        let options = GenerateOptions::new(module_name_for(&self.query), "");
        let module = translate_document(&schema, &document, &options)
            .with_context(|| format!("failed to translate {}", self.query.display()))?;

        let response_src = std::fs::read_to_string(&self.response)
            .with_context(|| format!("failed to read {}", self.response.display()))?;
        let response = serde_json::from_str::<serde_json::Value>(&response_src)
            .with_context(|| format!("failed to parse JSON {}", self.response.display()))?;
        let data = response.pointer(&self.json_pointer).ok_or_else(|| {
            anyhow!(
                "JSON pointer {} selects nothing in {}",
                self.json_pointer,
                self.response.display()
            )
        })?;

        let operation = match &self.operation {
            Some(name) => name.clone(),
            None => module
                .requests()
                .next()
                .map(|op| op.operation_name.clone())
                .ok_or_else(|| anyhow!("{} defines no operation", self.query.display()))?,
        };
        let value = Runtime::new(&module)
            .decode_response(&operation, data)
            .with_context(|| format!("failed to decode {}", self.response.display()))?;
        println!("{value}");
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                target.run()
            }
            Command::Decode(target) => target.run(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn default_source_directories() -> Vec<String> {
    vec!["src".to_string()]
}

/// Every `.graphql` file under the project's source directories.
pub fn discover_sources(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let project_path = PROJECT_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            anyhow!(
                "no elm-package.json or elm.json in {}; pass inputs with -i",
                root.display()
            )
        })?;
    let project_src = std::fs::read_to_string(&project_path)
        .with_context(|| format!("failed to read {}", project_path.display()))?;
    let project: ElmProject = crate::path_de::from_str_with_path(&project_src)
        .with_context(|| format!("invalid {}", project_path.display()))?;

    let mut out = Vec::new();
    for directory in &project.source_directories {
        let pattern = root.join(directory).join("**").join("*.graphql");
        let pattern = pattern.to_string_lossy();
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            if !is_hidden_or_vendored(path.strip_prefix(root).unwrap_or(path.as_path())) {
                out.push(path);
            }
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn is_hidden_or_vendored(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(segment) => {
            let segment = segment.to_string_lossy();
            segment == "node_modules" || segment.starts_with('.')
        }
        _ => false,
    })
}

fn run_elm_format(path: &Path) {
    match Process::new("elm-format").arg("--yes").arg(path).output() {
        Ok(output) if output.status.success() => {}
        Ok(output) => warn!(
            path = %path.display(),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "elm-format failed"
        ),
        Err(error) => warn!(path = %path.display(), %error, "elm-format could not be run"),
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_skips_hidden_and_vendored_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::write(root.join("elm.json"), r#"{"source-directories": ["src"]}"#)
            .expect("write elm.json");
        for path in [
            "src/Queries/Hero.graphql",
            "src/node_modules/pkg/Ignored.graphql",
            "src/.cache/Ignored.graphql",
            "src/Other.txt",
        ] {
            let path = root.join(path);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(&path, "{ a }").expect("write");
        }
        let found = discover_sources(root).expect("discovers");
        assert_eq!(found, [root.join("src/Queries/Hero.graphql")]);
    }

    #[test]
    fn missing_project_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = discover_sources(dir.path()).expect_err("no project file");
        assert!(error.to_string().contains("elm.json"));
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a/B.graphql"]).expect("resolves");
        assert_eq!(paths, [PathBuf::from("a/B.graphql")]);
    }
}
