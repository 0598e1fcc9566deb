use std::{collections::HashMap, sync::Arc};

use super::*;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use shared::error::ErrorKind;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct ListServerState {
    responses: Arc<HashMap<String, (StatusCode, &'static str)>>,
    seen_cursors: Arc<Mutex<Vec<Option<String>>>>,
}

async fn handle_list(
    State(state): State<ListServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let cursor = query.get(NEXT_CURSOR_PARAM).cloned();
    state.seen_cursors.lock().await.push(cursor.clone());
    let (status, body) = state
        .responses
        .get(&cursor.unwrap_or_default())
        .copied()
        .unwrap_or((StatusCode::NOT_FOUND, "{}"));
    (status, body.to_string())
}

async fn spawn_list_server(
    responses: Vec<(&str, StatusCode, &'static str)>,
) -> (String, Arc<Mutex<Vec<Option<String>>>>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let seen_cursors = Arc::new(Mutex::new(Vec::new()));
    let state = ListServerState {
        responses: Arc::new(
            responses
                .into_iter()
                .map(|(cursor, status, body)| (cursor.to_string(), (status, body)))
                .collect(),
        ),
        seen_cursors: seen_cursors.clone(),
    };
    let app = Router::new()
        .route("/photos", get(handle_list))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), seen_cursors)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReceivedField {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct UploadServerState {
    status: StatusCode,
    body: &'static str,
    received: Arc<Mutex<Vec<ReceivedField>>>,
}

async fn handle_upload(
    State(state): State<UploadServerState>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        fields.push(ReceivedField {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    *state.received.lock().await = fields;
    (state.status, state.body.to_string())
}

async fn spawn_upload_server(
    path: &str,
    status: StatusCode,
    body: &'static str,
) -> (String, Arc<Mutex<Vec<ReceivedField>>>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = UploadServerState {
        status,
        body,
        received: received.clone(),
    };
    let app = Router::new()
        .route(path, post(handle_upload))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), received)
}

fn photo_file() -> UploadFile {
    UploadFile {
        filename: "ring.jpg".into(),
        mime_type: Some("image/jpeg".into()),
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00],
    }
}

fn field<'a>(fields: &'a [ReceivedField], name: &str) -> &'a ReceivedField {
    fields
        .iter()
        .find(|field| field.name == name)
        .unwrap_or_else(|| panic!("missing multipart field {name}"))
}

#[tokio::test]
async fn list_requests_first_page_without_cursor_then_with_cursor() {
    let (base_url, seen) = spawn_list_server(vec![
        (
            "",
            StatusCode::OK,
            r#"{"photos":["a.jpg","b.jpg"],"next_cursor":"X"}"#,
        ),
        ("X", StatusCode::OK, r#"{"photos":["c.jpg"],"next_cursor":null}"#),
    ])
    .await;
    let list = HttpPhotoList::new(format!("{base_url}/"));

    let first = list.fetch_page(None).await.expect("first page");
    assert_eq!(first.photos.len(), 2);
    assert_eq!(first.next_cursor, Some(Cursor::from("X")));

    let second = list
        .fetch_page(first.next_cursor.as_ref())
        .await
        .expect("second page");
    assert_eq!(second.photos, vec![PhotoRef::from("c.jpg")]);
    assert!(!second.has_more());

    assert_eq!(*seen.lock().await, vec![None, Some("X".to_string())]);
}

#[tokio::test]
async fn list_accepts_legacy_array_body() {
    let (base_url, _seen) =
        spawn_list_server(vec![("", StatusCode::OK, r#"["a.jpg","b.jpg"]"#)]).await;
    let page = HttpPhotoList::new(base_url)
        .fetch_page(None)
        .await
        .expect("page");
    assert_eq!(
        page.photos,
        vec![PhotoRef::from("a.jpg"), PhotoRef::from("b.jpg")]
    );
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn list_server_error_carries_message() {
    let (base_url, _seen) = spawn_list_server(vec![(
        "",
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"Cloud listing unavailable"}"#,
    )])
    .await;
    let err = HttpPhotoList::new(base_url)
        .fetch_page(None)
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        GalleryError::server(500, "Cloud listing unavailable")
    );
}

#[tokio::test]
async fn list_body_without_photos_is_malformed() {
    let (base_url, _seen) = spawn_list_server(vec![(
        "",
        StatusCode::OK,
        r#"{"message":"Photo upload API running!"}"#,
    )])
    .await;
    let err = HttpPhotoList::new(base_url)
        .fetch_page(None)
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn unreachable_list_endpoint_is_network_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = HttpPhotoList::new(format!("http://{addr}"))
        .fetch_page(None)
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::NetworkFailure);
}

#[tokio::test]
async fn backend_upload_posts_image_and_event_fields() {
    let (base_url, received) = spawn_upload_server(
        "/upload",
        StatusCode::OK,
        r#"{"message":"Upload successful","url":"https://cdn.example.net/ring.jpg"}"#,
    )
    .await;
    let uploader = HttpUploader::new(UploadContract::backend(base_url));

    let photo = uploader
        .upload(photo_file(), &EventTag::from("sangeet"))
        .await
        .expect("upload");
    assert_eq!(photo, PhotoRef::from("https://cdn.example.net/ring.jpg"));

    let fields = received.lock().await.clone();
    let image = field(&fields, "image");
    assert_eq!(image.file_name.as_deref(), Some("ring.jpg"));
    assert_eq!(image.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(image.bytes, photo_file().bytes);
    assert_eq!(field(&fields, "event").bytes, b"sangeet".to_vec());
}

#[tokio::test]
async fn backend_upload_failure_uses_error_string() {
    let (base_url, _received) = spawn_upload_server(
        "/upload",
        StatusCode::BAD_REQUEST,
        r#"{"error":"No file selected"}"#,
    )
    .await;
    let err = HttpUploader::new(UploadContract::backend(base_url))
        .upload(photo_file(), &EventTag::default())
        .await
        .expect_err("must fail");
    assert_eq!(err, GalleryError::server(400, "No file selected"));
}

#[tokio::test]
async fn media_host_upload_posts_preset_and_tags() {
    let (base_url, received) = spawn_upload_server(
        "/v1_1/demo/image/upload",
        StatusCode::OK,
        r#"{"secure_url":"https://res.example.net/demo/ring.jpg","public_id":"ring"}"#,
    )
    .await;
    let contract = UploadContract::media_host(
        format!("{base_url}/v1_1/demo/image/upload"),
        "event_unsigned",
    );
    let photo = HttpUploader::new(contract)
        .upload(photo_file(), &EventTag::from("reception"))
        .await
        .expect("upload");
    assert_eq!(photo, PhotoRef::from("https://res.example.net/demo/ring.jpg"));

    let fields = received.lock().await.clone();
    assert_eq!(field(&fields, "file").file_name.as_deref(), Some("ring.jpg"));
    assert_eq!(
        field(&fields, "upload_preset").bytes,
        b"event_unsigned".to_vec()
    );
    assert_eq!(field(&fields, "tags").bytes, b"reception".to_vec());
}

#[tokio::test]
async fn media_host_failure_reads_nested_message_or_falls_back() {
    let (base_url, _received) = spawn_upload_server(
        "/upload",
        StatusCode::BAD_REQUEST,
        r#"{"error":{"message":"Upload preset must be whitelisted"}}"#,
    )
    .await;
    let err = HttpUploader::new(UploadContract::media_host(format!("{base_url}/upload"), "p"))
        .upload(photo_file(), &EventTag::default())
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        GalleryError::server(400, "Upload preset must be whitelisted")
    );

    let (base_url, _received) =
        spawn_upload_server("/upload", StatusCode::BAD_GATEWAY, "Bad Gateway").await;
    let err = HttpUploader::new(UploadContract::media_host(format!("{base_url}/upload"), "p"))
        .upload(photo_file(), &EventTag::default())
        .await
        .expect_err("must fail");
    assert_eq!(err, GalleryError::server(502, "Upload failed"));
}

#[tokio::test]
async fn custom_field_names_are_used() {
    let (base_url, received) =
        spawn_upload_server("/upload", StatusCode::OK, r#"{"url":"x.jpg"}"#).await;
    let contract = UploadContract::Backend {
        base_url,
        fields: BackendFields {
            image: "photo".into(),
            tag: "category".into(),
        },
    };
    HttpUploader::new(contract)
        .upload(photo_file(), &EventTag::from("mehndi"))
        .await
        .expect("upload");

    let fields = received.lock().await.clone();
    assert_eq!(field(&fields, "photo").file_name.as_deref(), Some("ring.jpg"));
    assert_eq!(field(&fields, "category").bytes, b"mehndi".to_vec());
}

#[test]
fn contract_endpoints() {
    assert_eq!(
        UploadContract::backend("https://api.example.com/").endpoint(),
        "https://api.example.com/upload"
    );
    assert_eq!(
        cloud_upload_url("demo"),
        "https://api.cloudinary.com/v1_1/demo/image/upload"
    );
}
