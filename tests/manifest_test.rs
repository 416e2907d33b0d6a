use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use imgmirror::{
    ContentDigest, CreateRepositoryOutcome, LineRewriter, MappingStore, Mirrorer, RegistryClient,
    RegistryManagement, Result,
};

const WEBHOOK: &str = "gcr.io/knative-releases/serving/webhook:v0.4.4@sha256:26cb5fdb9a5fe575919869331172e2b73de01084c043191748fbd45ba443abc2";

#[derive(Clone)]
struct RecordingClient {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingClient {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl RegistryClient for RecordingClient {
    async fn pull(&self, reference: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("pull {reference}"));
        Ok(())
    }

    async fn tag(&self, source: &str, destination: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("tag {source} {destination}"));
        Ok(())
    }

    async fn push(&self, destination: &str) -> Result<ContentDigest> {
        self.calls.lock().unwrap().push(format!("push {destination}"));
        Ok(format!("sha256:{}", "deadbeef".repeat(8)).parse().unwrap())
    }
}

struct NoopHub;

#[async_trait]
impl RegistryManagement for NoopHub {
    async fn create_repository(
        &self,
        _name: &str,
        _description: &str,
    ) -> Result<CreateRepositoryOutcome> {
        Ok(CreateRepositoryOutcome::AlreadyExists)
    }
}

fn rewriter() -> LineRewriter {
    LineRewriter::new(&["gcr.io".to_string(), "cgr.dev".to_string()]).unwrap()
}

fn mirrorer_in(
    dir: &tempfile::TempDir,
    client: RecordingClient,
) -> Mirrorer<RecordingClient, NoopHub> {
    let store = MappingStore::load(&dir.path().join("mapping.json")).unwrap();
    Mirrorer::new("orgname".to_string(), store, client, NoopHub)
}

#[test]
fn test_find_references_across_hosts() {
    let rewriter = rewriter();
    let line = "containers: gcr.io/project/app:v1.2 and cgr.dev/chainguard/static";

    assert_eq!(
        rewriter.find_references(line),
        vec![
            "gcr.io/project/app:v1.2".to_string(),
            "cgr.dev/chainguard/static".to_string(),
        ]
    );
}

#[test]
fn test_yaml_colon_is_not_a_tag() {
    let rewriter = rewriter();

    assert_eq!(
        rewriter.find_references("image: gcr.io/project/app: something"),
        vec!["gcr.io/project/app".to_string()]
    );
}

#[tokio::test]
async fn test_comment_lines_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let client = RecordingClient::new();
    let mut mirrorer = mirrorer_in(&dir, client.clone());
    let rewriter = rewriter();

    let line = format!("  # image: {WEBHOOK}");
    let rewritten = rewriter.rewrite_line(&mut mirrorer, &line).await.unwrap();

    assert_eq!(rewritten, line);
    assert!(client.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_reference_is_rewritten_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let client = RecordingClient::new();
    let mut mirrorer = mirrorer_in(&dir, client);
    let rewriter = rewriter();

    let line = format!("        image: {WEBHOOK}");
    let rewritten = rewriter.rewrite_line(&mut mirrorer, &line).await.unwrap();

    assert_eq!(
        rewritten,
        format!(
            "        image: orgname/gcr.io.knative-releases.serving.webhook:v0.4.4@sha256:{}",
            "deadbeef".repeat(8)
        )
    );
}

#[tokio::test]
async fn test_manifest_preserves_line_order_and_count() {
    let dir = tempfile::tempdir().unwrap();
    let client = RecordingClient::new();
    let mut mirrorer = mirrorer_in(&dir, client);
    let rewriter = rewriter();

    let lines: Vec<String> = [
        "apiVersion: apps/v1",
        "kind: Deployment",
        "# gcr.io/project/app:v1 stays put",
        "        image: gcr.io/project/app:v1",
        "",
        "        image: cgr.dev/chainguard/static",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let rewritten = rewriter
        .rewrite_manifest(&mut mirrorer, lines.clone())
        .await
        .unwrap();

    assert_eq!(rewritten.len(), lines.len());
    assert_eq!(rewritten[0], lines[0]);
    assert_eq!(rewritten[2], lines[2]);
    assert_eq!(rewritten[4], "");
    assert!(rewritten[3].contains("orgname/gcr.io.project.app:v1"));
    assert!(rewritten[5].contains("orgname/cgr.dev.chainguard.static"));
}

#[tokio::test]
async fn test_rerun_is_byte_identical_with_zero_registry_calls() {
    let dir = tempfile::tempdir().unwrap();
    let rewriter = rewriter();

    let lines = vec![
        "spec:".to_string(),
        format!("  image: {WEBHOOK}"),
        "  image: gcr.io/project/app:v1".to_string(),
    ];

    let first = {
        let mut mirrorer = mirrorer_in(&dir, RecordingClient::new());
        rewriter
            .rewrite_manifest(&mut mirrorer, lines.clone())
            .await
            .unwrap()
    };

    let client = RecordingClient::new();
    let mut mirrorer = mirrorer_in(&dir, client.clone());
    let second = rewriter
        .rewrite_manifest(&mut mirrorer, lines)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(client.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_reference_on_one_line_replaced_together() {
    let dir = tempfile::tempdir().unwrap();
    let client = RecordingClient::new();
    let mut mirrorer = mirrorer_in(&dir, client.clone());
    let rewriter = rewriter();

    let line = "gcr.io/project/app:v1 gcr.io/project/app:v1";
    let rewritten = rewriter.rewrite_line(&mut mirrorer, line).await.unwrap();

    let expected = format!(
        "orgname/gcr.io.project.app:v1@sha256:{d} orgname/gcr.io.project.app:v1@sha256:{d}",
        d = "deadbeef".repeat(8)
    );
    assert_eq!(rewritten, expected);
    // The second discovery of the same text is a cache hit.
    assert_eq!(
        client
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("pull"))
            .count(),
        1
    );
}
