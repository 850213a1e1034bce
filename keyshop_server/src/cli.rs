use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty. Returns true if the help was printed.
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
    const DISPLAY_ENVS: [&str; 17] = [
        "RUST_LOG",
        "KSP_HOST",
        "KSP_PORT",
        "KSP_DATABASE_URL",
        "KSP_MAX_CONNECTIONS",
        "KSP_USE_X_FORWARDED_FOR",
        "KSP_USE_FORWARDED",
        "KSP_WEBHOOK_IP_WHITELIST",
        "KSP_SWEEP_INTERVAL_SECS",
        "KSP_DEPOSIT_SWEEP_INTERVAL_SECS",
        "KSP_STOCK_SYNC_INTERVAL_SECS",
        "KSP_PERMISSION_CACHE_TTL_SECS",
        "KSP_BANK_NAME",
        "KSP_ACCOUNT_NAME",
        "KSP_QR_PROVIDER",
        "KSP_BANK_BIN",
        "KSP_MOMO_NAME",
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
