//! Integration tests for segmented (HLS) asset serving.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use common::{pattern, stream, upload, CopyTranscoder, TestHarness};
use vs_core::config::Config;
use vs_core::{ArtifactLayout, ConversionStatus};

async fn segmented_asset() -> (TestHarness, SocketAddr, String, Vec<u8>) {
    let mut config = Config::default();
    config.transcode.layout = ArtifactLayout::Segmented;
    let (h, addr) = TestHarness::with_server_config(config, Arc::new(CopyTranscoder)).await;

    let data = pattern(4096);
    let body: serde_json::Value = upload(addr, "clip.mp4", data.clone()).await.json().await.unwrap();
    let asset = body["filename"].as_str().unwrap().to_string();
    h.wait_for_status(&asset, ConversionStatus::Ready).await;

    (h, addr, asset, data)
}

async fn get(addr: SocketAddr, path: &str) -> reqwest::Response {
    reqwest::get(format!("http://{addr}{path}")).await.unwrap()
}

#[tokio::test]
async fn serves_playlists_and_segments_with_suffix_types() {
    let (h, addr, asset, data) = segmented_asset().await;

    let record = h.record(&asset).unwrap();
    assert_eq!(record.layout, ArtifactLayout::Segmented);
    assert!(record.size > data.len() as i64);

    let resp = get(addr, &format!("/hls/{asset}/main.m3u8")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/vnd.apple.mpegurl");
    assert!(resp.text().await.unwrap().contains("480p.m3u8"));

    let resp = get(addr, &format!("/hls/{asset}/480p_000.ts")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp2t");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &data[..]);
}

#[tokio::test]
async fn unknown_suffix_falls_back_to_octet_stream() {
    let (h, addr, asset, _) = segmented_asset().await;
    std::fs::write(h.ctx.artifact_path(&asset).join("notes.bin"), b"x").unwrap();

    let resp = get(addr, &format!("/hls/{asset}/notes.bin")).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
}

#[tokio::test]
async fn error_statuses() {
    let (h, addr, asset, _) = segmented_asset().await;
    std::fs::create_dir(h.ctx.artifact_path(&asset).join("sub")).unwrap();

    assert_eq!(get(addr, &format!("/hls/{asset}/missing.ts")).await.status(), 404);
    assert_eq!(get(addr, "/hls/unknown/main.m3u8").await.status(), 404);
    assert_eq!(get(addr, &format!("/hls/{asset}/sub")).await.status(), 403);
    assert_eq!(get(addr, &format!("/hls/{asset}")).await.status(), 400);
    assert_eq!(
        get(addr, &format!("/hls/{asset}/a%2F..%2F..%2Fsecret")).await.status(),
        400
    );
    assert_eq!(get(addr, "/hls/.incoming/anything.avi").await.status(), 400);
}

#[tokio::test]
async fn segmented_video_is_not_progressively_streamable() {
    let (_h, addr, asset, _) = segmented_asset().await;
    assert_eq!(stream(addr, &asset, None).await.status(), 400);
}

#[tokio::test]
async fn single_file_video_is_not_an_hls_asset() {
    let (h, addr) = TestHarness::with_server().await;
    h.seed_ready("clip.mp4", &pattern(10));
    assert_eq!(get(addr, "/hls/clip.mp4/main.m3u8").await.status(), 404);
}
