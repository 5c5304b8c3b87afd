use crate::e2e::helpers;

use helpers::{lesson, MockTtsRepository, TestContext};
use lesson_narrator::infrastructure::repositories::{Manifest, ManifestRepository};
use pretty_assertions::assert_eq;
use serde_json::Value;

#[tokio::test]
async fn it_should_write_a_manifest_for_the_batch() {
    let ctx = TestContext::new(MockTtsRepository::new().failing_on("BOOM"));
    let results = ctx
        .generate(lesson(7, &["One.", "BOOM.", "Three.", "Four."]))
        .await;

    let manifest = Manifest::from_results(ctx.service.provider(), ctx.output_root(), &results);
    let path = ManifestRepository::new(ctx.output_root())
        .save(&manifest)
        .await
        .unwrap();

    assert_eq!(path, ctx.output_root().join("manifest.json"));
    let json: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();

    assert_eq!(json["provider"], "mock");
    assert_eq!(json["attempted"], 4);
    assert_eq!(json["succeeded"], 3);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["success_rate"], 75.0);
    assert!(json["generated_at"].as_str().is_some());

    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0]["path"], "lesson7/slide1.mp3");
    assert_eq!(items[0]["status"], "success");
    assert_eq!(items[1]["status"], "failed");
    assert_eq!(items[1]["error_kind"], "backend");
}

#[tokio::test]
async fn it_should_replace_the_previous_manifest() {
    let ctx = TestContext::new(MockTtsRepository::new());
    let repo = ManifestRepository::new(ctx.output_root());

    let first = ctx.generate(lesson(1, &["A.", "B."])).await;
    repo.save(&Manifest::from_results("mock", ctx.output_root(), &first))
        .await
        .unwrap();

    let second = ctx.generate(lesson(1, &["A."])).await;
    repo.save(&Manifest::from_results("mock", ctx.output_root(), &second))
        .await
        .unwrap();

    let saved: Manifest = serde_json::from_slice(&std::fs::read(repo.path()).unwrap()).unwrap();
    assert_eq!(saved.attempted, 1);
    assert_eq!(saved.items.len(), 1);
}
