mod common;

use std::io::Cursor;

use axum::http::StatusCode;
use common::{encode, test_app, X_TOKEN};
use files_manager::object_store::{variant_key, ObjectStore};
use files_manager::storage::models::JobName;
use files_manager::worker::{JobError, JobHandler, ThumbnailPipeline};
use image::ImageFormat;
use serde_json::{json, Value};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 251) as u8, (y % 241) as u8, 90])
    });
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

#[tokio::test]
async fn test_image_upload_produces_three_variants() {
    let app = test_app();
    let token = app.signed_in("a@b.com", "pw").await;

    let image = app
        .create(
            &token,
            json!({
                "name": "photo.png",
                "type": "image",
                "isPublic": true,
                "data": encode(&png(1000, 600)),
            }),
        )
        .await;
    let id = image["id"].as_str().unwrap();
    assert_eq!(image["type"], "image");

    // Not generated yet
    app.server
        .get(&format!("/files/{id}/data"))
        .add_query_param("size", "100")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert_eq!(app.drain_thumbnails().await, 1);

    for width in [500u32, 250, 100] {
        let response = app
            .server
            .get(&format!("/files/{id}/data"))
            .add_query_param("size", width)
            .await;
        response.assert_status_ok();

        let decoded = image::load_from_memory(response.as_bytes()).unwrap();
        assert_eq!(decoded.width(), width);
        assert_eq!(decoded.height(), width * 600 / 1000);
    }

    let original = app.server.get(&format!("/files/{id}/data")).await;
    original.assert_status_ok();
    assert_eq!(original.header("content-type"), "image/png");
    assert_eq!(
        image::load_from_memory(original.as_bytes()).unwrap().width(),
        1000
    );

    app.server
        .get(&format!("/files/{id}/data"))
        .add_query_param("size", "64")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let stats: Value = app.server.get("/stats").await.json();
    assert_eq!(stats["jobs"]["queued"], 1); // the welcome job
    assert_eq!(stats["jobs"]["failed"], 0);
}

#[tokio::test]
async fn test_plain_files_queue_no_thumbnails() {
    let app = test_app();
    let token = app.signed_in("a@b.com", "pw").await;

    app.create(
        &token,
        json!({ "name": "a.txt", "type": "file", "data": encode(b"text") }),
    )
    .await;

    assert_eq!(app.drain_thumbnails().await, 0);
}

#[tokio::test]
async fn test_undecodable_image_completes_without_variants() {
    let app = test_app();
    let token = app.signed_in("a@b.com", "pw").await;

    let image = app
        .create(
            &token,
            json!({
                "name": "broken.png",
                "type": "image",
                "data": encode(b"not really a png"),
            }),
        )
        .await;
    let id = image["id"].as_str().unwrap();

    assert_eq!(app.drain_thumbnails().await, 1);

    let response = app
        .server
        .get(&format!("/files/{id}/data"))
        .add_query_param("size", "250")
        .add_header(X_TOKEN, token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let stats: Value = app.server.get("/stats").await.json();
    assert_eq!(stats["jobs"]["failed"], 0);
}

#[tokio::test]
async fn test_pipeline_rejects_bad_payloads() {
    let app = test_app();
    let token = app.signed_in("a@b.com", "pw").await;
    let folder = app
        .create(&token, json!({ "name": "docs", "type": "folder" }))
        .await;
    let user_id = folder["userId"].as_str().unwrap();
    let folder_id = folder["id"].as_str().unwrap();

    let pipeline = ThumbnailPipeline::new(app.state.db.clone(), app.object_store.clone());
    let job_for = |payload: Value| app.state.db.enqueue_job(JobName::Thumbnail, payload).unwrap();

    let result = pipeline.handle(&job_for(json!({ "userId": user_id }))).await;
    assert!(matches!(result, Err(JobError::MissingField("fileId"))));

    let result = pipeline.handle(&job_for(json!({ "fileId": folder_id }))).await;
    assert!(matches!(result, Err(JobError::MissingField("userId"))));

    let result = pipeline
        .handle(&job_for(json!({ "userId": "someone-else", "fileId": folder_id })))
        .await;
    assert!(matches!(result, Err(JobError::FileNotFound)));

    let result = pipeline
        .handle(&job_for(json!({ "userId": user_id, "fileId": folder_id })))
        .await;
    assert!(matches!(result, Err(JobError::NoContent)));
}

#[tokio::test]
async fn test_regenerating_overwrites_variants() {
    let app = test_app();
    app.object_store
        .put("source", png(400, 400).into())
        .await
        .unwrap();

    let pipeline = ThumbnailPipeline::new(app.state.db.clone(), app.object_store.clone());
    assert_eq!(pipeline.generate("source").await.unwrap(), 3);
    assert_eq!(pipeline.generate("source").await.unwrap(), 3);

    let small = app.object_store.get(&variant_key("source", 100)).await.unwrap();
    let decoded = image::load_from_memory(&small).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 100));
}
