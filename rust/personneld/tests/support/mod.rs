#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ROSTER_CSV: &str = "teacher_id,name,email,department,pin,role,admin_modules\n\
T001,Teacher One,t1@school.test,Science,1234,teacher,\n\
T002,Teacher Two,t2@school.test,Thai,5678,Teacher,\n\
M001,Module Admin,m1@school.test,Office,Ab12,module_admin,\"leave,awards\"\n\
S001,Super Admin,s1@school.test,Office,9999,superadmin,\n\
E001,Executive,e1@school.test,Office,7777,executive,\n";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn workspace_with_roster(prefix: &str) -> PathBuf {
    let ws = temp_dir(prefix);
    std::fs::write(ws.join("teachers.csv"), ROSTER_CSV).expect("write roster");
    ws
}

pub struct Sidecar {
    pub child: Child,
    pub stdin: ChildStdin,
    pub reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    pub fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_personneld");
        let mut child = Command::new(exe)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn personneld");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
        }
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: serde_json::Value =
            serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Sends a request that must fail and returns its error code.
    pub fn request_err(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }

    pub fn shutdown(self) {
        let Sidecar {
            mut child, stdin, ..
        } = self;
        drop(stdin);
        let _ = child.wait();
    }
}
