mod support;

use serde_json::json;
use support::{workspace_with_roster, Sidecar};

#[test]
fn health_and_catalog_methods_work_without_a_workspace() {
    let mut sc = Sidecar::spawn();

    let health = sc.request_ok("health", json!({}));
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
    assert!(health["workspacePath"].is_null());
    assert_eq!(health["session"]["state"], "anonymous");

    let sections = sc.request_ok("sections.list", json!({}));
    let dirs: Vec<&str> = sections["sections"]
        .as_array()
        .expect("sections")
        .iter()
        .filter_map(|s| s["dir"].as_str())
        .collect();
    assert_eq!(
        dirs,
        vec![
            "01_cover",
            "02_memo",
            "03_front_matter",
            "04_personal_info",
            "05_part1_development_agreement",
            "06_part2_challenge",
            "07_executive_comments_signatures",
        ]
    );

    let modules = sc.request_ok("modules.list", json!({}));
    let modules = modules["modules"].as_array().expect("modules");
    assert_eq!(modules.len(), 10);
    assert!(modules.iter().any(|m| m["key"] == "pa"));

    assert_eq!(sc.request_err("no.such.method", json!({})), "not_implemented");
    assert_eq!(sc.request_err("workspace.select", json!({})), "bad_params");

    sc.shutdown();
}

#[test]
fn malformed_line_gets_bad_json_and_loop_continues() {
    use std::io::{BufRead, Write};

    let ws = workspace_with_roster("personneld-ipc-smoke");
    let mut sc = Sidecar::spawn();
    writeln!(sc.stdin, "{{not json").expect("write");
    sc.stdin.flush().expect("flush");
    let mut line = String::new();
    sc.reader.read_line(&mut line).expect("read");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(v["ok"], false);
    assert_eq!(v["error"]["code"], "bad_json");

    let selected = sc.request_ok("workspace.select", json!({ "path": ws.to_string_lossy() }));
    assert_eq!(selected["workspacePath"], &*ws.to_string_lossy());
    let health = sc.request_ok("health", json!({}));
    assert_eq!(health["workspacePath"], &*ws.to_string_lossy());

    sc.shutdown();
    let _ = std::fs::remove_dir_all(ws);
}
