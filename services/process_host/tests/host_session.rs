//! Sessions driven through the host library entry point

use ao_actors::{Lifecycle, Process};
use ao_config::ProcessConfig;
use ao_process_host::run_session;
use serde_json::Value;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::tempdir;

fn responses(output: Vec<u8>) -> Vec<Value> {
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_bundled_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/process.toml");
    let config = ProcessConfig::load_with_prefix(Some(&path), "AO_HOST_TEST_BUNDLED").unwrap();
    assert_eq!(config.store.capacity, Some(100));
    assert!(!config.is_script_process());
}

#[test]
fn test_native_session_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("process.toml");
    fs::write(&path, "[process]\nname = \"Host Test\"\n\n[store]\ncapacity = 1\n").unwrap();
    let config = ProcessConfig::load_with_prefix(Some(&path), "AO_HOST_TEST_NATIVE").unwrap();

    let mut process = Process::from_config(&config);
    process.init().unwrap();

    let input = [
        r#"{"Action":"Info","From":"alice"}"#,
        r#"{"Action":"Set","Key":"a","Value":"1"}"#,
        r#"{"Action":"Set","Key":"b","Value":"2"}"#,
        r#"not json"#,
    ]
    .join("\n");

    let mut output = Vec::new();
    let summary = run_session(&mut process, Cursor::new(input), &mut output).unwrap();
    process.teardown();

    assert_eq!(summary.responses, 4);
    assert_eq!(summary.errors, 2);
    assert_eq!(process.lifecycle(), Lifecycle::ShutDown);

    let replies = responses(output);
    assert_eq!(replies[0]["Data"], "Hello from Host Test! State entries: 0");
    assert_eq!(replies[1]["Action"], "Set-Response");
    assert_eq!(replies[2]["Action"], "Error");
    assert_eq!(replies[3]["Target"], "unknown");
}

#[test]
fn test_invalid_utf8_line_gets_error_response() {
    let mut process = Process::native(&ProcessConfig::default());
    process.init().unwrap();

    let mut input = Vec::new();
    input.extend_from_slice(br#"{"Action":"Set","Key":"a","Value":"1","From":"alice"}"#);
    input.push(b'\n');
    input.extend_from_slice(b"{\"Action\":\"Get\",\"Key\":\"\xff\"}\n");
    input.extend_from_slice(br#"{"Action":"Get","Key":"a","From":"alice"}"#);
    input.push(b'\n');

    let mut output = Vec::new();
    let summary = run_session(&mut process, Cursor::new(input), &mut output).unwrap();

    assert_eq!(summary.lines_read, 3);
    assert_eq!(summary.responses, 3);
    assert_eq!(summary.errors, 1);

    let replies = responses(output);
    assert_eq!(replies[0]["Action"], "Set-Response");
    assert_eq!(replies[1]["Action"], "Error");
    assert_eq!(replies[1]["Target"], "unknown");
    assert_eq!(replies[2]["Data"], "1");
    assert_eq!(replies[2]["Target"], "alice");
}

#[cfg(feature = "lua")]
#[test]
fn test_bundled_script_session() {
    use ao_config::ScriptSettings;

    let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("scripts/process.lua");
    let mut config = ProcessConfig::default();
    config.script = Some(ScriptSettings::new(script));

    let mut process = Process::from_config(&config);
    process.init().unwrap();

    let input = [
        r#"{"Action":"Set","Key":"name","Value":"Alice","From":"bob"}"#,
        r#"{"Tags":{"Action":"Get","Key":"name"},"From":"bob"}"#,
        r#"{"Action":"Info"}"#,
        r#"{"Action":"Bogus"}"#,
    ]
    .join("\n");

    let mut output = Vec::new();
    run_session(&mut process, Cursor::new(input), &mut output).unwrap();

    let replies = responses(output);
    assert_eq!(replies[0]["Data"], "Successfully set name to Alice");
    assert_eq!(replies[1]["Data"], "Alice");
    assert_eq!(replies[1]["Target"], "bob");
    assert_eq!(replies[2]["Data"], "Hello from AO Process (Lua)! State entries: 1");
    assert!(replies[3]["Data"]
        .as_str()
        .unwrap()
        .contains("Unknown action: Bogus"));

    assert_eq!(process.inspect_state().unwrap(), r#"{"name":"Alice"}"#);
    process.teardown();
}
