use anyhow::{Context, Result};
use rmcp::{model::CallToolRequestParam, service::ServiceExt, transport::TokioChildProcess};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

fn locate_codescout_mcp_bin() -> Result<PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_codescout-mcp") {
        return Ok(PathBuf::from(path));
    }

    // Cargo doesn't always expose CARGO_BIN_EXE_* at runtime. Derive it from the test exe path:
    // `.../target/{debug|release}/deps/<test>` → `.../target/{debug|release}/codescout-mcp`
    if let Ok(exe) = std::env::current_exe() {
        if let Some(target_profile_dir) = exe.parent().and_then(|p| p.parent()) {
            let candidate = target_profile_dir.join("codescout-mcp");
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .ancestors()
        .nth(2)
        .context("failed to resolve repo root from CARGO_MANIFEST_DIR")?;
    for rel in ["target/debug/codescout-mcp", "target/release/codescout-mcp"] {
        let candidate = repo_root.join(rel);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    anyhow::bail!("failed to locate codescout-mcp binary")
}

#[tokio::test]
async fn mcp_exposes_tools_and_status_has_no_side_effects() -> Result<()> {
    let bin = locate_codescout_mcp_bin()?;
    let cache = tempfile::tempdir().context("tempdir for cache")?;

    let mut cmd = Command::new(bin);
    cmd.env_remove("CODESCOUT_API_KEY");
    cmd.env_remove("VOYAGE_API_KEY");
    cmd.env_remove("CODESCOUT_DEFAULT_PATH");
    cmd.env_remove("CODESCOUT_WARM_PATHS");
    cmd.env("CODESCOUT_CACHE_DIR", cache.path());
    cmd.env("RUST_LOG", "warn");

    let transport = TokioChildProcess::new(cmd).context("spawn mcp server")?;
    let service = tokio::time::timeout(Duration::from_secs(10), ().serve(transport))
        .await
        .context("timeout starting MCP server")??;

    let tools = tokio::time::timeout(
        Duration::from_secs(10),
        service.list_tools(Default::default()),
    )
    .await
    .context("timeout listing tools")??;
    let tool_names: HashSet<&str> = tools.tools.iter().map(|t| t.name.as_ref()).collect();
    for expected in ["search", "index", "status", "watch_start", "watch_stop"] {
        assert!(
            tool_names.contains(expected),
            "missing tool '{expected}' (available: {tool_names:?})"
        );
    }

    // status with no arguments lists tracked projects; a fresh server has
    // none and needs no credentials to answer.
    let status = tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: "status".into(),
            arguments: serde_json::json!({}).as_object().cloned(),
        }),
    )
    .await
    .context("timeout calling status")??;
    assert_ne!(status.is_error, Some(true), "status failed: {status:?}");
    let structured = status
        .structured_content
        .as_ref()
        .context("status returned no structured content")?;
    assert_eq!(structured["projects"], serde_json::json!([]));

    // status on a real but never-indexed directory reports it untracked
    // and must not index it as a side effect.
    let tmp = tempfile::tempdir().context("tempdir for project")?;
    std::fs::create_dir_all(tmp.path().join("src")).context("mkdir src")?;
    std::fs::write(
        tmp.path().join("src").join("main.rs"),
        "fn main() { println!(\"hi\"); }\n",
    )
    .context("write main.rs")?;

    let status = tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: "status".into(),
            arguments: serde_json::json!({ "path": tmp.path().to_string_lossy() })
                .as_object()
                .cloned(),
        }),
    )
    .await
    .context("timeout calling status with path")??;
    assert_ne!(status.is_error, Some(true), "status failed: {status:?}");
    let structured = status
        .structured_content
        .as_ref()
        .context("status returned no structured content")?;
    assert_eq!(structured["projects"][0]["state"], "uninitialized");
    assert_eq!(structured["projects"][0]["file_count"], 0);

    // Listing again still shows nothing tracked.
    let status = tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: "status".into(),
            arguments: serde_json::json!({}).as_object().cloned(),
        }),
    )
    .await
    .context("timeout calling status again")??;
    let structured = status
        .structured_content
        .as_ref()
        .context("status returned no structured content")?;
    assert_eq!(structured["projects"], serde_json::json!([]));

    service.cancel().await.context("shutdown")?;
    Ok(())
}

#[tokio::test]
async fn search_without_credentials_reports_missing_credential() -> Result<()> {
    let bin = locate_codescout_mcp_bin()?;
    let cache = tempfile::tempdir().context("tempdir for cache")?;
    let project = tempfile::tempdir().context("tempdir for project")?;
    std::fs::write(
        project.path().join("lib.rs"),
        "pub fn greet() -> &'static str { \"hello\" }\n",
    )
    .context("write lib.rs")?;

    let mut cmd = Command::new(bin);
    cmd.env_remove("CODESCOUT_API_KEY");
    cmd.env_remove("VOYAGE_API_KEY");
    cmd.env("CODESCOUT_CACHE_DIR", cache.path());
    cmd.env("RUST_LOG", "warn");

    let transport = TokioChildProcess::new(cmd).context("spawn mcp server")?;
    let service = tokio::time::timeout(Duration::from_secs(10), ().serve(transport))
        .await
        .context("timeout starting MCP server")??;

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: "search".into(),
            arguments: serde_json::json!({
                "query": "greeting function",
                "path": project.path().to_string_lossy(),
            })
            .as_object()
            .cloned(),
        }),
    )
    .await
    .context("timeout calling search")??;

    assert_eq!(result.is_error, Some(true));
    let structured = result
        .structured_content
        .as_ref()
        .context("error carried no structured content")?;
    assert_eq!(structured["error"]["code"], "missing_credential");

    service.cancel().await.context("shutdown")?;
    Ok(())
}
