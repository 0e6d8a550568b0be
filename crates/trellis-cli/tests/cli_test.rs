//! End-to-end runs of CLI commands against a temporary data directory.

use clap::Parser;
use serde_json::Value;
use tempfile::TempDir;

use trellis_cli::{execute, Cli};

const SAMPLE: &str = "<p>Ada Lovelace worked with Charles Babbage.</p> \
                      Charles Babbage designed Analytical Engine[2]. \
                      He (a mathematician) lived in London.";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[embedding]\nprovider = \"hashing\"\ndimensions = 128\n",
        )
        .unwrap();
        Self { dir }
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        let config = self.dir.path().join("config.toml");
        let data = self.dir.path().join("data");
        let mut argv = vec![
            "trellis".to_string(),
            "--config".to_string(),
            config.to_string_lossy().into_owned(),
            "--data-dir".to_string(),
            data.to_string_lossy().into_owned(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        execute(Cli::try_parse_from(argv)?).await
    }

    async fn json(&self, args: &[&str]) -> Value {
        serde_json::from_str(&self.run(args).await.unwrap()).unwrap()
    }
}

#[tokio::test]
async fn test_ingest_persists_between_runs() {
    let ws = Workspace::new();

    let out = ws.json(&["ingest", "--text", SAMPLE]).await;
    assert_eq!(out["version"], 1);
    assert_eq!(out["report"]["edges_created"], 2);

    let stats = ws.json(&["stats"]).await;
    assert_eq!(stats["nodes"], 3);
    assert_eq!(stats["edges"], 2);
    assert_eq!(stats["vectors"], 3);
}

#[tokio::test]
async fn test_query_json_and_text() {
    let ws = Workspace::new();
    ws.run(&["ingest", "--text", SAMPLE]).await.unwrap();

    let results = ws.json(&["query", "Ada Lovelace", "-k", "1"]).await;
    let results = results.as_array().unwrap();
    assert_eq!(results[0]["label"], "Ada Lovelace");
    assert_eq!(results[0]["is_hidden_gem"], false);
    assert!(results
        .iter()
        .any(|r| r["label"] == "Analytical Engine" && r["hop_distance"] == 2));

    let table = ws
        .run(&["query", "Ada Lovelace", "-k", "1", "--format", "text"])
        .await
        .unwrap();
    assert!(table.lines().nth(1).unwrap().contains("Ada Lovelace"));
}

#[tokio::test]
async fn test_query_rejects_hops_over_ceiling() {
    let ws = Workspace::new();
    ws.run(&["ingest", "--text", SAMPLE]).await.unwrap();
    assert!(ws.run(&["query", "Ada", "--max-hops", "5"]).await.is_err());
}

#[tokio::test]
async fn test_export_to_file() {
    let ws = Workspace::new();
    ws.run(&["ingest", "--text", SAMPLE]).await.unwrap();

    let path = ws.dir.path().join("out").join("graph.json");
    let printed = ws
        .run(&["export", "--output", path.to_str().unwrap()])
        .await
        .unwrap();
    assert!(printed.is_empty());

    let graph: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(graph["edges"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_remove_and_reset() {
    let ws = Workspace::new();
    ws.run(&["ingest", "--text", SAMPLE]).await.unwrap();

    assert!(ws.run(&["remove", "concept:nobody"]).await.is_err());
    assert!(ws.run(&["reset"]).await.is_err());
    assert_eq!(ws.json(&["stats"]).await["nodes"], 3);

    let out = ws.json(&["reset", "--yes"]).await;
    assert_eq!(out["version"], 2);
    let stats = ws.json(&["stats"]).await;
    assert_eq!(stats["nodes"], 0);
    assert_eq!(stats["edges"], 0);
}

#[tokio::test]
async fn test_snapshots_and_rollback() {
    let ws = Workspace::new();
    ws.run(&["ingest", "--text", SAMPLE]).await.unwrap();
    ws.run(&["reset", "--yes"]).await.unwrap();

    let listed = ws.json(&["snapshots"]).await;
    assert_eq!(listed["current"], 2);
    let versions: Vec<u64> = listed["snapshots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["version"].as_u64().unwrap())
        .collect();
    assert_eq!(versions, vec![2, 1]);
    assert_eq!(listed["snapshots"][1]["node_count"], 3);

    let out = ws.json(&["rollback", "1"]).await;
    assert_eq!(out["version"], 3);
    assert_eq!(out["stats"]["nodes"], 3);
    assert_eq!(ws.json(&["stats"]).await["edges"], 2);

    assert!(ws.run(&["rollback", "42"]).await.is_err());
}

#[tokio::test]
async fn test_config_write() {
    let ws = Workspace::new();
    let path = ws.dir.path().join("config.toml");

    let printed = ws.run(&["config", "--write"]).await.unwrap();
    assert_eq!(printed, path.display().to_string());

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[query]"));
    assert!(written.contains("dimensions = 128"));
    assert!(ws.run(&["stats"]).await.is_ok());
}

#[tokio::test]
async fn test_config_redacts_keys() {
    let ws = Workspace::new();
    std::fs::write(
        ws.dir.path().join("config.toml"),
        "[embedding]\nprovider = \"hashing\"\napi_key = \"sk-secret\"\n",
    )
    .unwrap();

    let shown = ws.run(&["config"]).await.unwrap();
    assert!(shown.contains("***"));
    assert!(!shown.contains("sk-secret"));
}
