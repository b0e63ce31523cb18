// Copyright 2026 Phonedex Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::net::TcpListener;
use std::net::TcpStream;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use assert_cmd::Command;
use jsonschema::JSONSchema;
use predicates::prelude::*;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

fn phonedex_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("phonedex"))
}

fn phonedex_cmd_with_env(config_root: &Path) -> Command {
    let mut cmd = phonedex_cmd();
    cmd.env("XDG_CONFIG_HOME", config_root);
    cmd.env("HOME", config_root);
    cmd.env("APPDATA", config_root);
    cmd.env_remove("PHONEDEX_LOG");
    cmd
}

fn global_config_path(config_root: &Path) -> PathBuf {
    let base = if cfg!(target_os = "macos") {
        config_root.join("Library").join("Application Support")
    } else {
        config_root.to_path_buf()
    };
    base.join("phonedex").join("phonedex.toml")
}

fn write_config(config_root: &Path, body: &str) {
    let path = global_config_path(config_root);
    fs::create_dir_all(path.parent().expect("config parent")).expect("config dir");
    fs::write(path, body).expect("write config");
}

fn load_schema() -> JSONSchema {
    let schema_text = include_str!("../schemas/response.schema.json");
    let schema_json: Value = serde_json::from_str(schema_text).expect("schema json");
    JSONSchema::options()
        .compile(&schema_json)
        .expect("compile schema")
}

fn assert_schema(schema: &JSONSchema, value: &Value) {
    if let Err(errors) = schema.validate(value) {
        let msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
        panic!("schema validation failed:\n{}", msgs.join("\n"));
    }
}

fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("parse json")
}

/// One recorded request: request line plus body.
#[derive(Debug, Clone)]
struct Recorded {
    line: String,
    body: String,
}

/// Minimal HTTP/1.1 responder. Routes match on path prefix; the first match
/// wins. Every response closes the connection.
struct StubServer {
    base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    fn start(routes: Vec<(&'static str, u16, Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let base = format!("http://{}", listener.local_addr().expect("addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                handle(stream, &routes, &log);
            }
        });
        Self { base, requests }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests").clone()
    }

    fn config(&self, extra: &str) -> String {
        format!("api_url = \"{}\"\n{extra}", self.base)
    }
}

fn handle(stream: TcpStream, routes: &[(&'static str, u16, Value)], log: &Mutex<Vec<Recorded>>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut line = String::new();
    if reader.read_line(&mut line).is_err() {
        return;
    }
    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).is_err() || header.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    let _ = reader.read_exact(&mut body);
    let line = line.trim().to_string();
    let path = line.split_whitespace().nth(1).unwrap_or("").to_string();
    log.lock().expect("log").push(Recorded {
        line,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let (status, payload) = routes
        .iter()
        .find(|(prefix, _, _)| path.starts_with(prefix))
        .map(|(_, status, body)| (*status, body.to_string()))
        .unwrap_or((404, "{\"detail\":\"not found\"}".to_string()));
    let reason = if status < 400 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let mut stream = stream;
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn apple_page() -> Value {
    json!({
        "models": [
            {"name": "iPhone 15", "brand": "Apple", "price": 799, "ram": 8, "battery": 3349},
            {"name": "iPhone 15 Plus", "brand": "Apple", "price": 899, "ram": 8},
            {"name": "iPhone 15 Pro", "brand": "Apple", "price": 999, "ram": 8, "processor": "A17 Pro"}
        ],
        "totalCount": 120,
        "filteredCount": 3
    })
}

#[test]
fn search_sends_filter_and_reports_counts() {
    let schema = load_schema();
    let server = StubServer::start(vec![("/api/models", 200, apple_page())]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    phonedex_cmd_with_env(config.path())
        .args(["search", "--brand", "Apple", "--min-ram", "8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 of 3 phones found"))
        .stdout(predicate::str::contains("Apple iPhone 15 Pro"));

    let requests = server.requests();
    let line = &requests[0].line;
    assert!(line.starts_with("GET /api/models?"), "{line}");
    assert!(line.contains("brand=Apple"), "{line}");
    assert!(line.contains("minRam=8"), "{line}");
    assert!(line.contains("sortBy=name"), "{line}");
    assert!(line.contains("limit=20"), "{line}");
    assert!(line.contains("offset=0"), "{line}");

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["search", "--brand", "Apple", "--min-ram", "8", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(value["ok"], json!(true));
    assert_eq!(value["stats"]["filtered"], json!(3));
    assert_eq!(value["stats"]["total"], json!(120));
    assert_eq!(value["stats"]["has_more"], json!(false));
    assert_eq!(value["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["query"]["backend"], json!("rest"));
    assert!(value.get("next_offset").is_none());
}

#[test]
fn search_page_beyond_results_warns() {
    let schema = load_schema();
    let server = StubServer::start(vec![(
        "/api/models",
        200,
        json!({"models": [], "totalCount": 120, "filteredCount": 3}),
    )]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["search", "--page", "4", "--limit", "2", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(value["query"]["offset"], json!(6));
    assert_eq!(value["warnings"][0], json!("page 4 is past the last page (2)"));
}

#[test]
fn search_flags_rows_outside_the_filter() {
    let schema = load_schema();
    let server = StubServer::start(vec![(
        "/api/models",
        200,
        json!({
            "models": [
                {"name": "iPhone 15", "brand": "Apple", "price": 799},
                {"name": "Galaxy S24", "brand": "Samsung", "price": 799}
            ],
            "totalCount": 120,
            "filteredCount": 2
        }),
    )]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    phonedex_cmd_with_env(config.path())
        .args(["search", "--brand", "Apple"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "warning: 1 rows do not match the current filter",
        ));

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["search", "--brand", "Apple", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(
        value["warnings"],
        json!(["1 rows do not match the current filter"])
    );
    assert_eq!(value["results"].as_array().map(Vec::len), Some(2));
}

#[test]
fn by_price_with_no_matches_reports_range() {
    let schema = load_schema();
    let server = StubServer::start(vec![(
        "/api/models/by-price",
        200,
        json!({"models": [], "totalCount": 0, "brands": []}),
    )]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    phonedex_cmd_with_env(config.path())
        .args(["by-price", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No phones found between $400.00 and $600.00",
        ));

    let requests = server.requests();
    assert!(requests[0].line.starts_with("POST /api/models/by-price"));
    let body: Value = serde_json::from_str(&requests[0].body).expect("request body");
    assert_eq!(body["price"], json!(500.0));
    assert_eq!(body["tolerance"], json!(0.2));
    assert!((body["minPrice"].as_f64().expect("minPrice") - 400.0).abs() < 1e-9);
    assert!((body["maxPrice"].as_f64().expect("maxPrice") - 600.0).abs() < 1e-9);

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["by-price", "500", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(
        value["message"],
        json!("No phones found between $400.00 and $600.00")
    );
}

#[test]
fn by_price_rejects_bad_tolerance_before_any_request() {
    let server = StubServer::start(Vec::new());
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["by-price", "500", "--tolerance", "1.5", "--json"]);
    let value = run_json(&mut cmd);
    assert_eq!(value["ok"], json!(false));
    assert_eq!(value["error"]["code"], json!("invalid_request"));
    assert!(server.requests().is_empty());
}

#[test]
fn export_writes_loaded_rows_only() {
    let schema = load_schema();
    let server = StubServer::start(vec![(
        "/api/models",
        200,
        json!({
            "models": [
                {"name": "Pixel 8", "brand": "Google", "price": 699},
                {"name": "Pixel 8 Pro", "brand": "Google", "price": 999},
                {"name": "Pixel 8a", "brand": "Google", "price": 499}
            ],
            "totalCount": 927,
            "filteredCount": 927
        }),
    )]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));
    let work = TempDir::new().expect("work tempdir");
    let out = work.path().join("page.csv");

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["export", "--limit", "3", "--json", "--out"])
        .arg(&out);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(value["export"]["rows"], json!(3));
    assert_eq!(value["stats"]["filtered"], json!(927));

    let text = fs::read_to_string(&out).expect("read export");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("name,brand,price,"));
    assert!(lines[1].starts_with("Pixel 8,Google,699"));
    assert!(server.requests()[0].line.contains("limit=3"));
}

#[test]
fn comparison_persists_and_respects_cap() {
    let schema = load_schema();
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), "comparison_cap = 2\n");

    phonedex_cmd_with_env(config.path())
        .args(["compare", "add", "Apple", "iPhone 15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added Apple iPhone 15"));
    phonedex_cmd_with_env(config.path())
        .args(["compare", "add", "apple", "IPHONE 15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already in the comparison"));
    phonedex_cmd_with_env(config.path())
        .args(["compare", "add", "Google", "Pixel 8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2/2 slots used"));

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["compare", "add", "Samsung", "Galaxy S24", "--json"]);
    let full = run_json(&mut cmd);
    assert_schema(&schema, &full);
    assert_eq!(full["ok"], json!(false));
    assert!(
        full["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("full"))
    );

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["compare", "list", "--json"]);
    let list = run_json(&mut cmd);
    assert_schema(&schema, &list);
    assert_eq!(
        list["comparison"],
        json!([
            {"brand": "Apple", "name": "iPhone 15"},
            {"brand": "Google", "name": "Pixel 8"}
        ])
    );

    let stored = global_config_path(config.path())
        .parent()
        .expect("config dir")
        .join("comparison.json");
    let on_disk: Value =
        serde_json::from_str(&fs::read_to_string(&stored).expect("read comparison")).expect("json");
    assert_eq!(on_disk, list["comparison"]);

    phonedex_cmd_with_env(config.path())
        .args(["compare", "rm", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed Apple iPhone 15"));
    phonedex_cmd_with_env(config.path())
        .args(["compare", "rm", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no comparison entry at position 5"));
    phonedex_cmd_with_env(config.path())
        .args(["compare", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("comparison is empty"));
}

#[test]
fn compare_show_fetches_current_specs() {
    let schema = load_schema();
    let server = StubServer::start(vec![(
        "/api/models",
        200,
        json!({
            "models": [
                {"name": "iPhone 15 Pro", "brand": "Apple", "price": 999},
                {"name": "iPhone 15", "brand": "Apple", "price": 799}
            ],
            "totalCount": 120,
            "filteredCount": 2
        }),
    )]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    phonedex_cmd_with_env(config.path())
        .args(["compare", "add", "Apple", "iPhone 15"])
        .assert()
        .success();
    phonedex_cmd_with_env(config.path())
        .args(["compare", "add", "Apple", "iPhone 99"])
        .assert()
        .success();

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["compare", "show", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(value["results"][0]["name"], json!("iPhone 15"));
    assert_eq!(value["results"][0]["price"], json!(799.0));
    assert_eq!(
        value["warnings"],
        json!(["Apple iPhone 99 is no longer in the dataset"])
    );
}

#[test]
fn server_error_becomes_json_envelope() {
    let schema = load_schema();
    let server = StubServer::start(vec![(
        "/api/models",
        500,
        json!({"detail": "database unavailable"}),
    )]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["search", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(value["ok"], json!(false));
    assert_eq!(value["error"]["code"], json!("http_status"));
    assert!(
        value["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("HTTP 500"))
    );

    phonedex_cmd_with_env(config.path())
        .args(["search"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn unreachable_service_reports_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let config = TempDir::new().expect("config tempdir");
    write_config(
        config.path(),
        &format!("api_url = \"http://127.0.0.1:{port}\"\ntimeout_secs = 2\n"),
    );

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["search", "--json"]);
    let value = run_json(&mut cmd);
    assert_eq!(value["error"]["code"], json!("transport"));
    assert_eq!(
        value["error"]["message"],
        json!("Could not reach the phone dataset service. Please try again later.")
    );
}

#[test]
fn similar_and_predict_round_trip() {
    let schema = load_schema();
    let server = StubServer::start(vec![
        (
            "/api/models/similar",
            200,
            json!({"models": [
                {"model": {"name": "Pixel 8", "brand": "Google", "ram": 8}, "similarityScore": 0.93}
            ]}),
        ),
        ("/predict/price", 200, json!({"price": 799.5})),
        ("/predict/brand", 200, json!({"prediction": "Samsung"})),
    ]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["similar", "--ram", "8", "--battery", "4500", "--limit", "3", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(value["results"][0]["similarityScore"], json!(0.93));
    let body: Value = serde_json::from_str(&server.requests()[0].body).expect("body");
    assert_eq!(body, json!({"ram": 8.0, "battery": 4500.0, "limit": 3}));

    phonedex_cmd_with_env(config.path())
        .args(["predict", "price", "--ram", "8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("predicted price: 799.50"));

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["predict", "brand", "--ram", "8", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(value["prediction"], json!({"target": "brand", "value": "Samsung"}));

    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["predict", "ram", "--json"]);
    let value = run_json(&mut cmd);
    assert_eq!(value["error"]["code"], json!("invalid_request"));
}

#[test]
fn similar_like_uses_dataset_specs() {
    let server = StubServer::start(vec![
        (
            "/api/models/similar",
            200,
            json!({"models": [
                {"model": {"name": "iPhone 15 Plus", "brand": "Apple"}, "similarityScore": 0.88}
            ]}),
        ),
        ("/api/models", 200, apple_page()),
    ]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    phonedex_cmd_with_env(config.path())
        .args(["similar", "--like", "Apple", "iPhone 15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Apple iPhone 15 Plus"));

    let requests = server.requests();
    assert!(requests[0].line.starts_with("GET /api/models?"));
    let body: Value = serde_json::from_str(&requests[1].body).expect("body");
    assert_eq!(body["brand"], json!("Apple"));
    assert_eq!(body["battery"], json!(3349.0));
    assert_eq!(body["limit"], json!(5));

    phonedex_cmd_with_env(config.path())
        .args(["similar", "--like", "Apple", "iPhone 99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Apple iPhone 99 is not in the dataset"));
}

#[test]
fn browse_reads_commands_from_stdin() {
    let server = StubServer::start(vec![("/api/models", 200, apple_page())]);
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), &server.config(""));

    phonedex_cmd_with_env(config.path())
        .args(["browse", "--brand", "Apple"])
        .write_stdin("c 2\nf ram >= 8\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("added Apple iPhone 15 Plus (1/5)"));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].line.contains("minRam=8"));

    phonedex_cmd_with_env(config.path())
        .args(["compare", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Apple iPhone 15 Plus"));
}

#[test]
fn params_json_is_canonical() {
    let schema = load_schema();
    let config = TempDir::new().expect("config tempdir");
    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args([
        "params",
        "--min-ram",
        "8",
        "--brand",
        "Apple",
        "--max-price",
        "100",
        "--min-price",
        "500",
        "--json",
    ]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    insta::assert_json_snapshot!(value["params"], @r#"
    [
      [
        "brand",
        "Apple"
      ],
      [
        "minRam",
        "8"
      ],
      [
        "sortBy",
        "name"
      ],
      [
        "sortOrder",
        "asc"
      ]
    ]
    "#);
}

#[test]
fn where_expression_rejects_strict_comparison() {
    let config = TempDir::new().expect("config tempdir");
    phonedex_cmd_with_env(config.path())
        .args(["params", "--where", "price < 500"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("use '<='"));
}

#[test]
fn init_writes_defaults_once() {
    let config = TempDir::new().expect("config tempdir");
    phonedex_cmd_with_env(config.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default config"));
    assert!(global_config_path(config.path()).exists());

    phonedex_cmd_with_env(config.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let schema = load_schema();
    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["config", "--json"]);
    let value = run_json(&mut cmd);
    assert_schema(&schema, &value);
    assert_eq!(value["config"]["page_limit"], json!(20));
    assert_eq!(value["config"]["backend"], json!("rest"));
}

#[test]
fn index_backend_requires_credentials() {
    let config = TempDir::new().expect("config tempdir");
    write_config(config.path(), "backend = \"index\"\n");
    let mut cmd = phonedex_cmd_with_env(config.path());
    cmd.args(["search", "--json"]);
    let value = run_json(&mut cmd);
    assert_eq!(value["ok"], json!(false));
    assert!(
        value["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("index.app_id"))
    );
}

#[test]
fn completions_render() {
    phonedex_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("phonedex"));
}
