//! Command-line client for catalog views.
//!
//! Lists, filters, facets, adds to and deletes from the collections described
//! in the views file. Flags map onto the `CATALOG_*` environment variables, so
//! the same settings work for scripts and interactive use. Records are printed
//! as NDJSON on stdout; warnings and errors go to stderr.

use anyhow::{Context, Result, bail};
use catalogview::config::{API_URL_VAR, TIMEOUT_VAR, TOKEN_VAR, VIEWS_VAR};
use catalogview::{
    AddOutcome, Attachment, AuthClient, CatalogView, ClientConfig, FilterUpdate, HttpSource,
    LoadStatus, NoticeKind, RecordId, SessionContext, ViewRegistry,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "catalog", version, about = "Browse and edit catalog views")]
struct Cli {
    /// Backend origin.
    #[arg(long, env = API_URL_VAR)]
    api_url: Option<String>,

    /// Views definition file.
    #[arg(long, env = VIEWS_VAR)]
    views: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, env = TIMEOUT_VAR)]
    timeout_secs: Option<u64>,

    /// Bearer token sent with collection requests.
    #[arg(long, env = TOKEN_VAR, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List configured views.
    Views,
    /// Fetch a view and print the records that pass the filters.
    List {
        view: String,
        /// Case-insensitive substring matched against the view's text field.
        #[arg(long)]
        query: Option<String>,
        /// Categorical filter as field=value; repeatable.
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,
    },
    /// Print the selector options for one field of a view.
    Facets { view: String, field: String },
    /// Create a record.
    Add {
        view: String,
        /// Draft field as field=value; repeatable.
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        fields: Vec<String>,
        /// File to upload with the draft as multipart form data.
        #[arg(long)]
        attach: Option<PathBuf>,
    },
    /// Delete a record by id.
    Delete { view: String, id: String },
    /// Sign in and print the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(execute(cli.command, &config))
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let api_url = cli.api_url.clone();
    let views = cli.views.as_ref().map(|p| p.to_string_lossy().into_owned());
    let timeout = cli.timeout_secs.map(|secs| secs.to_string());
    let token = cli.token.clone();
    ClientConfig::from_lookup(move |name| match name {
        API_URL_VAR => api_url.clone(),
        VIEWS_VAR => views.clone(),
        TIMEOUT_VAR => timeout.clone(),
        TOKEN_VAR => token.clone(),
        _ => None,
    })
}

async fn execute(command: Commands, config: &ClientConfig) -> Result<()> {
    match command {
        Commands::Views => {
            let registry = load_registry(config)?;
            for spec in registry.views() {
                let dims: Vec<&str> = spec.dimensions.iter().map(|d| d.field.as_str()).collect();
                println!(
                    "{}\t{}\t{}\ttext={}\tfacets={}",
                    spec.key,
                    spec.title,
                    spec.list_path(),
                    spec.text_field,
                    dims.join(",")
                );
            }
            Ok(())
        }
        Commands::List {
            view,
            query,
            filters,
        } => {
            let view = open_view(config, &view)?;
            ensure_loaded(&view).await?;
            if let Some(query) = query {
                view.set_filter(FilterUpdate::query(query));
            }
            for pair in &filters {
                let update = FilterUpdate::parse_pair(pair)
                    .with_context(|| format!("filter must be field=value, got '{pair}'"))?;
                view.set_filter(update);
            }
            for record in view.derived_list() {
                println!("{}", serde_json::to_string(&record)?);
            }
            Ok(())
        }
        Commands::Facets { view, field } => {
            let view = open_view(config, &view)?;
            ensure_loaded(&view).await?;
            println!("{}", serde_json::to_string(&view.dimension_options(&field))?);
            Ok(())
        }
        Commands::Add {
            view,
            fields,
            attach,
        } => {
            let view = open_view(config, &view)?;
            for pair in &fields {
                let (name, value) = pair
                    .split_once('=')
                    .with_context(|| format!("field must be field=value, got '{pair}'"))?;
                view.set_form_field(name.trim(), value.trim());
            }
            if let Some(path) = attach {
                attach_file(&view, &path)?;
            }
            match view.submit_form().await? {
                AddOutcome::Appended(record) => println!("{}", serde_json::to_string(&record)?),
                AddOutcome::Refetched(status) => report_status(&view, &status),
            }
            Ok(())
        }
        Commands::Delete { view, id } => {
            let view = open_view(config, &view)?;
            view.delete_record(&RecordId::parse(&id)).await?;
            eprintln!("deleted {id}");
            Ok(())
        }
        Commands::Login { email, password } => {
            let context = SessionContext::new();
            let session = AuthClient::with_client(config.http_client()?, &config.api_url)
                .login(&email, &password, &context)
                .await?;
            println!("{}", serde_json::to_string(&session)?);
            Ok(())
        }
    }
}

fn load_registry(config: &ClientConfig) -> Result<ViewRegistry> {
    ViewRegistry::load(&config.views_path)
        .with_context(|| format!("invalid views file {}", config.views_path.display()))
}

fn open_view(config: &ClientConfig, key: &str) -> Result<CatalogView<HttpSource>> {
    let registry = load_registry(config)?;
    let Some(spec) = registry.view(key) else {
        let known: Vec<&str> = registry.keys().map(|k| k.as_str()).collect();
        bail!("unknown view '{key}' (known: {})", known.join(", "));
    };
    let mut source = HttpSource::with_client(config.http_client()?, &config.api_url, spec);
    if let Some(token) = &config.session_token {
        source = source.with_token(token);
    }
    Ok(CatalogView::new(spec.clone(), source))
}

async fn ensure_loaded(view: &CatalogView<HttpSource>) -> Result<()> {
    match view.load().await {
        LoadStatus::Failed(err) => Err(err.into()),
        status => {
            report_status(view, &status);
            Ok(())
        }
    }
}

fn report_status(view: &CatalogView<HttpSource>, status: &LoadStatus) {
    if let LoadStatus::Failed(err) = status {
        eprintln!("warning: record saved but refresh failed: {err}");
        return;
    }
    if let Some(notice) = view.notice() {
        if notice.kind == NoticeKind::Warning {
            eprintln!("warning: {}", notice.message);
        }
    }
}

/// Attach `path` to the view's form, filling the file name and type fields
/// the upload endpoint expects when the caller did not set them.
fn attach_file(view: &CatalogView<HttpSource>, path: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?
        .to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let content_type = extension.as_deref().and_then(content_type_for);

    let form = view.form();
    if form.get("fileName").is_none() {
        view.set_form_field("fileName", file_name.clone());
    }
    if form.get("fileType").is_none() {
        let file_type = extension
            .map(Value::from)
            .unwrap_or_else(|| Value::from("file"));
        view.set_form_field("fileType", file_type);
    }
    view.set_form_attachment(Attachment {
        part_name: "file".to_string(),
        file_name,
        content_type: content_type.map(str::to_string),
        bytes,
    });
    Ok(())
}

fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "txt" => Some("text/plain"),
        "zip" => Some("application/zip"),
        "ppt" => Some("application/vnd.ms-powerpoint"),
        "pptx" => Some("application/vnd.openxmlformats-officedocument.presentationml.presentation"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        _ => None,
    }
}
