use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use catalogview::{ViewRegistry, ViewSpec};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

pub const FACULTY_EMAIL: &str = "faculty@example.edu";
pub const FACULTY_PASSWORD: &str = "secret";
pub const FACULTY_SESSION: &str = "sess-42";

pub fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn shipped_registry() -> ViewRegistry {
    ViewRegistry::load(&repo_root().join("schema").join("views.json"))
        .expect("shipped views file must validate")
}

pub fn shipped_view(key: &str) -> ViewSpec {
    shipped_registry()
        .view(key)
        .cloned()
        .unwrap_or_else(|| panic!("view {key} missing from shipped views"))
}

#[derive(Clone, Debug)]
pub struct Upload {
    pub fields: HashMap<String, String>,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// In-memory stand-in for the catalog REST backend.
#[derive(Default)]
pub struct BackendState {
    collections: Mutex<HashMap<&'static str, Vec<Value>>>,
    next_id: AtomicI64,
    degrade_lists: AtomicBool,
    pub auth_headers: Mutex<Vec<Option<String>>>,
    pub uploads: Mutex<Vec<Upload>>,
}

impl BackendState {
    pub fn seed(&self, view: &'static str, records: Vec<Value>) {
        let max_id = records
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0);
        self.next_id.fetch_max(max_id, Ordering::SeqCst);
        self.collections.lock().unwrap().insert(view, records);
    }

    pub fn records(&self, view: &'static str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(view)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every list endpoint answer `{"message": ...}` instead of an array.
    pub fn degrade_lists(&self, on: bool) {
        self.degrade_lists.store(on, Ordering::SeqCst);
    }

    fn observe(&self, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth_headers.lock().unwrap().push(auth);
    }

    fn insert(&self, view: &'static str, mut record: Value) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        record["id"] = json!(id);
        self.collections
            .lock()
            .unwrap()
            .entry(view)
            .or_default()
            .push(record.clone());
        record
    }

    fn remove(&self, view: &'static str, id: &str) -> bool {
        let mut collections = self.collections.lock().unwrap();
        let Some(records) = collections.get_mut(view) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| match r.get("id") {
            Some(Value::Number(n)) => n.to_string() != id,
            Some(Value::String(s)) => s != id,
            _ => true,
        });
        records.len() != before
    }
}

type Shared = Arc<BackendState>;

pub struct Backend {
    pub base_url: String,
    pub state: Shared,
}

impl Backend {
    pub async fn spawn() -> Backend {
        let state: Shared = Arc::new(BackendState::default());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .merge(collection(
                "subjects",
                "/api/faculty/subjects/all",
                "/api/faculty/subjects/add",
                "/api/faculty/subjects/delete/:id",
                false,
            ))
            .merge(collection(
                "lectures",
                "/api/lectures",
                "/api/lectures",
                "/api/lectures/:id",
                true,
            ))
            .merge(collection(
                "resources",
                "/api/resources/all",
                "/api/resources/add",
                "/api/resources/delete/:id",
                false,
            ))
            .route("/api/resource-files/all", get(list_files))
            .route("/api/resource-files/upload", post(upload_file))
            .route(
                "/api/resource-files/delete/:id",
                delete(
                    |State(state): State<Shared>, UrlPath(id): UrlPath<String>| async move {
                        remove_response(&state, "files", &id)
                    },
                ),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Backend {
            base_url: format!("http://{addr}"),
            state,
        }
    }
}

fn collection(
    view: &'static str,
    list_path: &str,
    create_path: &str,
    delete_path: &str,
    echo_created: bool,
) -> Router<Shared> {
    let list = move |State(state): State<Shared>, headers: HeaderMap| async move {
        list_response(&state, view, &headers)
    };
    let create = move |State(state): State<Shared>, Json(body): Json<Value>| async move {
        let created = state.insert(view, body);
        if echo_created {
            (StatusCode::CREATED, Json(created)).into_response()
        } else {
            (StatusCode::OK, Json(json!({"message": "Added successfully"}))).into_response()
        }
    };
    let remove = move |State(state): State<Shared>, UrlPath(id): UrlPath<String>| async move {
        remove_response(&state, view, &id)
    };

    let router = if create_path == list_path {
        Router::new().route(list_path, get(list).post(create))
    } else {
        Router::new()
            .route(list_path, get(list))
            .route(create_path, post(create))
    };
    router.route(delete_path, delete(remove))
}

fn list_response(state: &BackendState, view: &'static str, headers: &HeaderMap) -> Response {
    state.observe(headers);
    if state.degrade_lists.load(Ordering::SeqCst) {
        return Json(json!({"message": format!("No {view} available")})).into_response();
    }
    Json(Value::Array(state.records(view))).into_response()
}

fn remove_response(state: &BackendState, view: &'static str, id: &str) -> Response {
    if state.remove(view, id) {
        (StatusCode::OK, Json(json!({"message": "Deleted"}))).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"message": "Record not found"}))).into_response()
    }
}

async fn list_files(State(state): State<Shared>, headers: HeaderMap) -> Response {
    list_response(&state, "files", &headers)
}

async fn upload_file(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut upload = Upload {
        fields: HashMap::new(),
        file_name: None,
        bytes: Vec::new(),
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let Ok(data) = field.bytes().await else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        if file_name.is_some() {
            upload.file_name = file_name;
            upload.bytes = data.to_vec();
        } else {
            upload
                .fields
                .insert(name, String::from_utf8_lossy(&data).into_owned());
        }
    }
    if upload.file_name.is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "file part missing"})))
            .into_response();
    }
    let record = json!({
        "fileName": upload.fields.get("fileName").cloned().unwrap_or_default(),
        "fileType": upload.fields.get("fileType").cloned().unwrap_or_default(),
    });
    state.insert("files", record);
    state.uploads.lock().unwrap().push(upload);
    (StatusCode::OK, "File uploaded successfully").into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    if email == FACULTY_EMAIL && password == FACULTY_PASSWORD {
        Json(json!({"role": "FACULTY", "email": email, "sessionId": FACULTY_SESSION}))
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid email or password"})),
        )
            .into_response()
    }
}
