//! Tool inventory for `--print-tools`, kept in one place so the flag and
//! the router never drift apart silently.

use serde_json::json;

pub const TOOL_NAMES: [&str; 5] = ["search", "index", "status", "watch_start", "watch_stop"];

#[must_use]
pub fn tool_inventory_json(version: &str) -> String {
    let tools = json!([
        {
            "name": "search",
            "description": "Hybrid semantic + keyword code search; indexes the project on first use"
        },
        {
            "name": "index",
            "description": "Build or refresh a project's search index"
        },
        {
            "name": "status",
            "description": "Report tracked projects and index freshness without indexing anything"
        },
        {
            "name": "watch_start",
            "description": "Watch a project and refresh its index as files change"
        },
        {
            "name": "watch_stop",
            "description": "Stop watching one project, or all of them"
        },
    ]);
    serde_json::to_string_pretty(&json!({
        "server": "codescout-mcp",
        "version": version,
        "tools": tools,
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_lists_every_tool() {
        let payload = tool_inventory_json("0.0.0-test");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        let names: Vec<&str> = value["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, TOOL_NAMES);
    }
}
