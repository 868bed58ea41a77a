use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "OMS_HOST",
        "OMS_PORT",
        "OMS_HOSTNAME",
        "OMS_LOG_LEVEL",
        "OMS_ACCESS_LOG",
        "OMS_DB_HOST",
        "OMS_DB_PORT",
        "OMS_DB_USER",
        "OMS_DB_NAME",
        "OMS_DB_SSLMODE",
        "OMS_DB_MAX_CONNECTIONS",
        "OMS_EVENT_QUEUE_SIZE",
        "OMS_EVENT_PROCESSING_DELAY_MS",
        "OMS_IDEMPOTENCY_TTL_SECS",
        "OMS_IDEMPOTENCY_PURGE_INTERVAL_SECS",
        "OMS_REQUEST_TIMEOUT_SECS",
        "OMS_SHUTDOWN_GRACE_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
