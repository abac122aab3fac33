// End-to-end checks for catalog views against an in-process backend.
//
// Each test spawns its own mock REST service (see `support`) and drives the
// library through `HttpSource` exactly as the `catalog` binary does.

mod support;

use anyhow::{Context, Result};
use catalogview::{
    AddOutcome, Attachment, AuthClient, CatalogError, CatalogView, ClientConfig, Draft,
    FilterUpdate, HttpSource, LoadStatus, NoticeKind, RecordId, SessionContext, Subject,
    ViewRegistry, facet_table, parse_record_stream,
};
use serde_json::{Value, json};
use std::fs;
use support::{
    Backend, FACULTY_EMAIL, FACULTY_PASSWORD, FACULTY_SESSION, repo_root, shipped_registry,
    shipped_view,
};
use tempfile::TempDir;

fn subject_rows() -> Vec<Value> {
    vec![
        json!({"id": 1, "title": "Calculus", "tutorName": "R. Iyer", "department": "MCA", "semester": 1}),
        json!({"id": 2, "title": "Physics", "tutorName": "S. Rao", "department": "CSE", "semester": 2}),
    ]
}

fn ids(records: &[catalogview::Record]) -> Vec<String> {
    records.iter().map(|r| r.id.to_string()).collect()
}

async fn subjects_view(backend: &Backend) -> CatalogView<HttpSource> {
    let spec = shipped_view("subjects");
    CatalogView::new(spec.clone(), HttpSource::new(&backend.base_url, &spec))
}

#[test]
fn shipped_views_file_validates() -> Result<()> {
    let registry = shipped_registry();
    let keys: Vec<&str> = registry.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["files", "lectures", "resources", "subjects"]);

    let subjects = registry.view("subjects").context("subjects view")?;
    assert_eq!(subjects.delete_path(&RecordId::from(7))?, "/api/faculty/subjects/delete/7");
    assert_eq!(subjects.empty_form().get("semester"), Some(&json!(1)));

    let lectures = registry.view("lectures").context("lectures view")?;
    assert_eq!(lectures.delete_path(&RecordId::parse("abc"))?, "/api/lectures/abc");
    Ok(())
}

#[test]
fn views_file_with_unknown_fields_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let mut raw: Value = serde_json::from_str(&fs::read_to_string(
        repo_root().join("schema").join("views.json"),
    )?)?;
    raw["views"][0]["colour"] = json!("blue");
    let path = dir.path().join("views.json");
    fs::write(&path, serde_json::to_vec(&raw)?)?;

    let err = ViewRegistry::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("schema validation"));
    Ok(())
}

#[tokio::test]
async fn subjects_filter_and_delete_over_http() -> Result<()> {
    let backend = Backend::spawn().await;
    backend.state.seed("subjects", subject_rows());
    let view = subjects_view(&backend).await;

    assert_eq!(
        view.load().await,
        LoadStatus::Applied {
            records: 2,
            skipped: 0
        }
    );
    assert_eq!(ids(&view.set_filter(FilterUpdate::query("cal"))), vec!["1"]);

    view.set_filter(FilterUpdate::query(""));
    assert_eq!(
        ids(&view.set_filter(FilterUpdate::category("department", "CSE"))),
        vec!["2"]
    );

    assert!(view.delete_record(&RecordId::from(1)).await?);
    assert_eq!(ids(&view.records()), vec!["2"]);
    assert_eq!(view.facet_options("department"), vec!["All", "CSE"]);
    assert_eq!(backend.state.records("subjects").len(), 1);

    let typed: Subject = view.records()[0].to_entity()?;
    assert_eq!(typed.tutor_name, "S. Rao");
    Ok(())
}

#[tokio::test]
async fn deleting_missing_record_is_idempotent() -> Result<()> {
    let backend = Backend::spawn().await;
    backend.state.seed("subjects", subject_rows());
    let view = subjects_view(&backend).await;
    view.load().await;

    let removed = view.delete_record(&RecordId::from(99)).await?;
    assert!(!removed);
    assert_eq!(view.len(), 2);
    Ok(())
}

#[tokio::test]
async fn add_subject_refetches_collection() -> Result<()> {
    let backend = Backend::spawn().await;
    backend.state.seed("subjects", subject_rows());
    let view = subjects_view(&backend).await;
    view.load().await;

    view.set_form_field("title", "Compiler Design");
    view.set_form_field("tutorName", "A. Nair");
    view.set_form_field("department", "BTech");
    view.set_form_field("semester", "5");
    let outcome = view.submit_form().await?;

    assert!(matches!(
        outcome,
        AddOutcome::Refetched(LoadStatus::Applied { records: 3, .. })
    ));
    let stored = backend.state.records("subjects");
    assert_eq!(stored[2]["semester"], json!(5));
    assert_eq!(stored[2]["id"], json!(3));
    assert_eq!(view.form(), view.spec().empty_form());
    assert_eq!(view.notice().map(|n| n.kind), Some(NoticeKind::Success));
    Ok(())
}

#[tokio::test]
async fn invalid_subject_is_not_sent() -> Result<()> {
    let backend = Backend::spawn().await;
    let view = subjects_view(&backend).await;

    view.set_form_field("title", "Compiler Design");
    let err = view.submit_form().await.unwrap_err();
    assert_eq!(err.field_errors()[0].field, "tutorName");
    assert!(backend.state.records("subjects").is_empty());
    assert_eq!(view.form().get("title"), Some(&json!("Compiler Design")));
    Ok(())
}

#[tokio::test]
async fn lecture_add_appends_echoed_record() -> Result<()> {
    let backend = Backend::spawn().await;
    let spec = shipped_view("lectures");
    let view = CatalogView::new(spec.clone(), HttpSource::new(&backend.base_url, &spec));
    view.load().await;

    let draft = Draft::new()
        .with_field("title", "Normal forms")
        .with_field("instructor", "P. Das")
        .with_field("subject", "DBMS")
        .with_field("unit", "Unit 3")
        .with_field("videoUrl", "https://videos.example.edu/nf");
    let outcome = view.add_record(draft).await?;
    let AddOutcome::Appended(record) = outcome else {
        panic!("lectures append the echoed record");
    };
    assert_eq!(record.field_text("subject").as_deref(), Some("DBMS"));
    assert_eq!(view.facet_options("subject"), vec!["All", "DBMS"]);
    assert_eq!(view.dimension_options("unit").len(), 13);
    assert_eq!(backend.state.auth_headers.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn non_array_payload_degrades() -> Result<()> {
    let backend = Backend::spawn().await;
    backend.state.seed("subjects", subject_rows());
    backend.state.degrade_lists(true);
    let view = subjects_view(&backend).await;

    let status = view.load().await;
    assert_eq!(
        status,
        LoadStatus::Degraded {
            message: "No subjects available".to_string()
        }
    );
    assert!(view.is_empty());
    assert_eq!(view.notice().map(|n| n.kind), Some(NoticeKind::Warning));
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_keeps_previous_records() -> Result<()> {
    let backend = Backend::spawn().await;
    backend.state.seed("subjects", subject_rows());
    let spec = shipped_view("subjects");
    let view = CatalogView::new(spec.clone(), HttpSource::new(&backend.base_url, &spec));
    view.load().await;

    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let dead_url = format!("http://{}", closed.local_addr()?);
    drop(closed);
    let dead = CatalogView::new(spec.clone(), HttpSource::new(dead_url, &spec));
    let status = dead.load().await;
    assert!(matches!(status, LoadStatus::Failed(CatalogError::Transport { .. })));
    assert!(dead.is_empty());
    assert_eq!(
        dead.notice().map(|n| n.message),
        Some("Failed to load records.".to_string())
    );
    assert_eq!(view.len(), 2);
    Ok(())
}

#[tokio::test]
async fn file_upload_uses_multipart() -> Result<()> {
    let backend = Backend::spawn().await;
    let spec = shipped_view("files");
    let view = CatalogView::new(spec.clone(), HttpSource::new(&backend.base_url, &spec));

    let draft = Draft::new()
        .with_field("fileName", "syllabus.pdf")
        .with_field("fileType", "pdf")
        .with_attachment(Attachment {
            part_name: "file".to_string(),
            file_name: "syllabus.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF-1.4".to_vec(),
        });
    let outcome = view.add_record(draft).await?;
    assert!(matches!(
        outcome,
        AddOutcome::Refetched(LoadStatus::Applied { records: 1, .. })
    ));

    let uploads = backend.state.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name.as_deref(), Some("syllabus.pdf"));
    assert_eq!(uploads[0].bytes, b"%PDF-1.4");
    assert_eq!(uploads[0].fields.get("fileType").map(String::as_str), Some("pdf"));
    assert_eq!(view.facet_options("fileType"), vec!["All", "pdf"]);
    Ok(())
}

#[tokio::test]
async fn session_token_follows_sign_in_and_out() -> Result<()> {
    let backend = Backend::spawn().await;
    let context = SessionContext::new();
    let spec = shipped_view("resources");
    let source = HttpSource::new(&backend.base_url, &spec).with_session(context.clone());
    let view = CatalogView::new(spec, source);

    let auth = AuthClient::new(&backend.base_url);
    let err = auth.login(FACULTY_EMAIL, "wrong", &context).await.unwrap_err();
    assert_eq!(err.user_message("Sign-in failed"), "Invalid email or password");

    let session = auth
        .login(FACULTY_EMAIL, FACULTY_PASSWORD, &context)
        .await?;
    assert!(session.role.can_manage());
    view.load().await;

    context.sign_out();
    view.load().await;

    let headers = backend.state.auth_headers.lock().unwrap().clone();
    assert_eq!(
        headers,
        vec![Some(format!("Bearer {FACULTY_SESSION}")), None]
    );
    Ok(())
}

#[test]
fn config_points_at_shipped_views() -> Result<()> {
    let config = ClientConfig::from_lookup(|_| None)?;
    let registry = ViewRegistry::load(&config.views_path)?;
    assert!(registry.view("files").is_some());
    Ok(())
}

#[test]
fn record_dump_round_trips_through_filter() -> Result<()> {
    let dump = subject_rows()
        .iter()
        .map(|row| serde_json::to_string(row))
        .collect::<Result<Vec<_>, _>>()?
        .join("\n");
    let records = parse_record_stream(&dump)?;
    let filter = catalogview::FilterState::new().with(FilterUpdate::category("semester", "2"));
    let matching = catalogview::derived_list(&records, "title", &filter);
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].id, RecordId::from(2));
    Ok(())
}

#[test]
fn dump_facets_cover_records_outside_the_filter() -> Result<()> {
    let dump = "{\"id\":1,\"title\":\"Calculus\",\"department\":\"MCA\"}\n\
                {\"id\":2,\"title\":\"Physics\",\"department\":\"CSE\"}";
    let records = parse_record_stream(dump)?;
    let filter = catalogview::FilterState::new().with(FilterUpdate::query("cal"));
    assert_eq!(catalogview::derived_list(&records, "title", &filter).len(), 1);

    let facets = facet_table(&records, &["department"]);
    assert_eq!(facets["department"], vec!["All", "MCA", "CSE"]);
    Ok(())
}
