use agent_gateway::config::AppConfig;
use agent_gateway::mcp::ConflictPolicy;
use serial_test::serial;
use std::{env, fs, time::Duration};

// Variables that would otherwise leak between tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("GATEWAY_SERVER__PORT");
        env::remove_var("GATEWAY_MCP__CONFLICT_RESOLUTION");
        env::remove_var("GATEWAY_MCP__TIMEOUT_PER_SERVER_SECS");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("SERVERS_FILE");
        env::remove_var("LOG_JSON");
    }
}

fn load(args: &[&str]) -> AppConfig {
    let argv = std::iter::once("agent-gateway").chain(args.iter().copied());
    AppConfig::load_from_args(argv).expect("Failed to load config")
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = load(&[]);
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.mcp.max_concurrent_servers, 5);
    assert_eq!(config.mcp.conflict_resolution, ConflictPolicy::Prefix);

    let options = config.mcp.load_options();
    assert_eq!(options.timeout_per_server, Duration::from_secs(30));
    let settings = config.mcp.client_settings();
    assert_eq!(settings.max_retries, 3);
    assert_eq!(settings.retry_base_delay, Duration::from_secs(1));
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("GATEWAY_SERVER__PORT", "9090");
        env::set_var("GATEWAY_MCP__CONFLICT_RESOLUTION", "replace");
        env::set_var("GATEWAY_MCP__TIMEOUT_PER_SERVER_SECS", "2.5");
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.mcp.conflict_resolution, ConflictPolicy::Replace);
    assert_eq!(
        config.mcp.load_options().timeout_per_server,
        Duration::from_millis(2500)
    );

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("gateway.yaml");
    fs::write(
        &file_path,
        r"
server:
  port: 7070
mcp:
  conflict_resolution: skip
  max_concurrent_servers: 8
",
    )
    .unwrap();

    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.mcp.conflict_resolution, ConflictPolicy::Skip);
    assert_eq!(config.mcp.max_concurrent_servers, 8);

    clear_env_vars();
}

#[test]
#[serial]
fn test_env_beats_file() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("gateway.yaml");
    fs::write(&file_path, "server:\n  port: 7070\n").unwrap();
    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
        env::set_var("GATEWAY_SERVER__PORT", "9191");
    }

    let config = load(&[]);
    assert_eq!(config.server.port, 9191);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_beats_env_and_file() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("gateway.yaml");
    fs::write(&file_path, "server:\n  port: 7070\n").unwrap();
    unsafe {
        env::set_var("GATEWAY_SERVER__PORT", "9090");
    }

    let path = file_path.to_string_lossy().into_owned();
    let config = load(&[
        "--config",
        &path,
        "--port",
        "5050",
        "--servers-file",
        "fleet.yaml",
    ]);
    assert_eq!(config.server.port, 5050);
    assert_eq!(config.mcp.servers_file, "fleet.yaml");

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env_vars();

    let result =
        AppConfig::load_from_args(["agent-gateway", "--config", "/nonexistent/gateway.yaml"]);
    assert!(result.is_err());
}
