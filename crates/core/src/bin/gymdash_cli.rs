//! CLI client for the training dashboard backend.
//!
//! Examples:
//!   gymdash-cli status
//!   gymdash-cli start
//!   gymdash-cli save my-run --overwrite
//!   gymdash-cli env sfiii3n
//!   gymdash-cli batch 128 4
//!   gymdash-cli shader scanlines off
//!
//! The server defaults to http://127.0.0.1:5000; override with `--server URL`
//! or a `{"server": "..."}` entry in the settings file (see `paths`).

use std::process;
use std::rc::Rc;

use gymdash::api::http::HttpBackend;
use gymdash::api::{Backend, EnvSettingValue, LogSource, OptionEntry};
use gymdash::batch::{choice_for, BatchSizeChoice};
use gymdash::characters::CharacterModal;
use gymdash::config::StoredConfig;
use gymdash::config_sync::ConfigSync;
use gymdash::error::DashError;
use gymdash::form::Form;
use gymdash::paths::{AppPaths, CliSettings};
use gymdash::runtime::TokioRuntime;
use gymdash::session::{NoticeLevel, Session};
use gymdash::settings::SettingsPanel;
use gymdash::shaders::ShaderToggles;
use gymdash::status::{StatusPoller, TRAINING_POLL_INTERVAL};
use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!("Usage: gymdash-cli [--server URL] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  status                      Show training and render status");
    eprintln!("  watch                       Print status changes until interrupted");
    eprintln!("  start | stop                Start or stop training with the active config");
    eprintln!("  configs                     List saved configurations");
    eprintln!("  load <name>                 Print a saved configuration (or 'default')");
    eprintln!("  save <name> [--overwrite]   Save the active configuration under a name");
    eprintln!("  delete <name>               Delete a saved configuration");
    eprintln!("  env <game>                  Show the environment settings of a game");
    eprintln!("  characters <game>           List the selectable characters of a game");
    eprintln!("  batch <n_steps> <num_envs>  Show valid batch sizes (offline)");
    eprintln!("  logs                        Follow the training log stream");
    eprintln!("  shaders                     Show shader toggles");
    eprintln!("  shader <key> <on|off>       Toggle one shader effect ('all' for every effect)");
    eprintln!("  credentials                 Check whether credentials are stored");
    eprintln!("  token <value>               Store an access token");
    eprintln!("  paths                       Show the settings file location");
    process::exit(1);
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_args() -> (Option<String>, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut server = None;
    if args.len() >= 2 && args[0] == "--server" {
        server = Some(args[1].clone());
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (server, args)
}

fn arg(args: &[String], index: usize) -> &str {
    match args.get(index) {
        Some(value) => value,
        None => usage(),
    }
}

/// Prints queued notices: successes to stdout, problems to stderr.
fn flush_notices(session: &Session) {
    for notice in session.take_notices() {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => println!("{}", notice.text),
            NoticeLevel::Warning | NoticeLevel::Error => eprintln!("{}", notice.text),
        }
    }
}

fn print_config(config: &StoredConfig) {
    match serde_json::to_string_pretty(config) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Failed to render configuration: {e}"),
    }
}

fn describe_setting(value: &EnvSettingValue) -> String {
    match value {
        EnvSettingValue::Options(entries) => {
            let options: Vec<String> = entries
                .iter()
                .map(|entry| match entry {
                    OptionEntry::Pair { value, label } => format!("{label}={value}"),
                    OptionEntry::Bare(value) => value.to_string(),
                })
                .collect();
            format!("[{}]", options.join(", "))
        }
        EnvSettingValue::Scalar(value) => value.to_string(),
    }
}

/// Loads the backend's active configuration into the session form, for
/// commands that send "the current config" without a page to read it from.
async fn load_active(backend: &HttpBackend, session: &Session) -> Result<(), DashError> {
    let stored = match backend.current_config().await? {
        Some(stored) => stored,
        None => backend.load_default_config().await?,
    };
    session.update(|s| s.form = Form::from_stored(&stored));
    Ok(())
}

async fn run(backend: Rc<HttpBackend>, args: Vec<String>) -> Result<(), DashError> {
    let session = Session::new();
    let runtime = TokioRuntime;
    let poller = StatusPoller::new(session.clone(), Rc::clone(&backend), runtime);
    let configs = ConfigSync::new(session.clone(), Rc::clone(&backend));

    let result = match args[0].as_str() {
        "status" => {
            let training = backend.training_status().await?.training;
            let rendering = backend.render_status().await?.rendering;
            println!(
                "training={} rendering={}",
                if training { "Running" } else { "Stopped" },
                rendering
            );
            Ok(())
        }
        "watch" => {
            let mut last = None;
            loop {
                let now = poller.poll_training().await;
                if now != last {
                    let label = session.with(|s| s.status.label());
                    match now {
                        Some(_) => println!("{label}"),
                        None => println!("{label} (backend unreachable)"),
                    }
                    last = now;
                }
                tokio::time::sleep(TRAINING_POLL_INTERVAL).await;
            }
        }
        "start" => {
            load_active(&backend, &session).await?;
            poller.start_training().await
        }
        "stop" => poller.stop_training().await,
        "configs" => {
            let names = configs.list().await?;
            println!("default");
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
        "load" => {
            let stored = configs.load(arg(&args, 1)).await?;
            print_config(&stored);
            Ok(())
        }
        "save" => {
            let name = arg(&args, 1).to_string();
            let overwrite = args.get(2).is_some_and(|a| a == "--overwrite");
            load_active(&backend, &session).await?;
            configs.save(&name, overwrite).await
        }
        "delete" => configs.delete(arg(&args, 1)).await,
        "env" => {
            let schema = backend.update_game_environment(arg(&args, 1)).await?;
            for (key, value) in &schema.env_settings {
                println!("{key}: {}", describe_setting(value));
            }
            println!("filter_keys: {}", schema.filter_keys.join(", "));
            Ok(())
        }
        "characters" => {
            let roster = backend.characters(arg(&args, 1)).await?;
            let mut modal = CharacterModal::default();
            modal.open(roster);
            println!("{}", modal.instructions());
            for name in modal.roster() {
                println!("  {name}");
            }
            Ok(())
        }
        "logs" => {
            let mut source = backend.open_log_stream().await?;
            while let Some(line) = source.next_line().await {
                println!("{}", line?);
            }
            Ok(())
        }
        "shaders" => {
            let status = backend.shader_status().await?;
            session.update(|s| s.shaders.seed(&status.shader_settings));
            session.with(|s| {
                for (key, enabled) in s.shaders.entries() {
                    println!("{key:<18} {}", if enabled { "on" } else { "off" });
                }
                println!("{:<18} {}", "all", if s.shaders.all() { "on" } else { "off" });
            });
            Ok(())
        }
        "shader" => {
            let key = arg(&args, 1);
            let Some(enabled) = parse_bool(arg(&args, 2)) else {
                eprintln!("state must be on|off");
                process::exit(1);
            };
            let toggles = ShaderToggles::new(session.clone(), Rc::clone(&backend));
            if key == "all" {
                toggles.toggle_all(enabled).await
            } else {
                toggles.toggle(key, enabled).await
            }
        }
        "credentials" => {
            let panel = SettingsPanel::new(session.clone(), Rc::clone(&backend), runtime);
            if panel.check_credentials().await {
                println!("Credentials found.");
            } else {
                println!("Credentials missing.");
            }
            Ok(())
        }
        "token" => {
            let panel = SettingsPanel::new(session.clone(), Rc::clone(&backend), runtime);
            panel.save_token(arg(&args, 1)).await
        }
        _ => usage(),
    };

    flush_notices(&session);
    result
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (server_flag, args) = parse_args();

    // Offline commands.
    match args[0].as_str() {
        "paths" => {
            match AppPaths::new() {
                Ok(paths) => {
                    println!("Config directory: {}", paths.config_dir().display());
                    println!("Settings file: {}", paths.settings_file().display());
                }
                Err(e) => {
                    eprintln!("{e}");
                    process::exit(1);
                }
            }
            return;
        }
        "batch" => {
            let parse = |raw: &str, what: &str| -> i64 {
                raw.parse().unwrap_or_else(|_| {
                    eprintln!("{what} must be an integer");
                    process::exit(1);
                })
            };
            let n_steps = parse(arg(&args, 1), "n_steps");
            let num_envs = parse(arg(&args, 2), "num_envs");
            match choice_for(n_steps, num_envs) {
                BatchSizeChoice::Sizes { sizes, default } => {
                    let listed: Vec<String> = sizes.iter().map(u64::to_string).collect();
                    println!("batch sizes: {}", listed.join(", "));
                    println!("default: {default}");
                }
                BatchSizeChoice::Unavailable => {
                    eprintln!("{}", gymdash::batch::NO_VALID_BATCH_SIZES);
                    process::exit(1);
                }
            }
            return;
        }
        _ => {}
    }

    let settings = AppPaths::new()
        .map(|paths| CliSettings::load(&paths.settings_file()))
        .unwrap_or_default();
    let server = settings.server(server_flag.as_deref());

    let backend = match HttpBackend::new(&server) {
        Ok(backend) => Rc::new(backend),
        Err(e) => {
            eprintln!("Invalid server URL {server}: {e}");
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };
    let local = tokio::task::LocalSet::new();
    if let Err(e) = local.block_on(&rt, run(backend, args)) {
        eprintln!("Failed: {e}");
        process::exit(1);
    }
}
