use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use npc_link::fixtures::ScenarioId;
use npc_link::{run, CommandKind, CommonOptions, SessionId};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        print_usage();
        return Ok(());
    }

    let mut options = CommonOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--base-url" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --base-url".to_string())?;
                options.base_url = value.clone();
                index += 2;
            }
            _ => break,
        }
    }

    let command = args
        .get(index)
        .ok_or_else(|| "missing subcommand".to_string())?
        .as_str();
    let command_args = &args[(index + 1)..];

    let kind = match command {
        "avatars" => {
            if !command_args.is_empty() {
                return Err("avatars takes no arguments".to_string());
            }
            CommandKind::Avatars
        }
        "init" => parse_init(command_args)?,
        "chat" => match command_args {
            [session] => CommandKind::Chat {
                session: SessionId::new(session.clone()),
            },
            _ => return Err("chat requires exactly one session id".to_string()),
        },
        "fixtures" => match command_args {
            [] => CommandKind::Fixtures { scenario: None },
            [key] => CommandKind::Fixtures {
                scenario: Some(
                    ScenarioId::from_key(key)
                        .ok_or_else(|| format!("unknown scenario '{key}'"))?,
                ),
            },
            _ => return Err("fixtures takes at most one scenario".to_string()),
        },
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    run(kind, options, &mut io::stdout())
}

fn parse_init(args: &[String]) -> Result<CommandKind, String> {
    let mut name = None;
    let mut background = String::new();
    let mut behavior = String::new();
    let mut story = None;
    let mut behavior_script = None;
    let mut image = None;

    let mut index = 0usize;
    while index < args.len() {
        let flag = args[index].as_str();
        let value = args
            .get(index + 1)
            .ok_or_else(|| format!("missing value for {flag}"))?
            .clone();
        match flag {
            "--name" => name = Some(value),
            "--background" => background = value,
            "--behavior" => behavior = value,
            "--story" => story = Some(PathBuf::from(value)),
            "--behavior-script" => behavior_script = Some(PathBuf::from(value)),
            "--image" => image = Some(PathBuf::from(value)),
            other => return Err(format!("unknown init argument '{other}'")),
        }
        index += 2;
    }

    let name = name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| "init requires --name".to_string())?;
    Ok(CommandKind::Init {
        name,
        background,
        behavior,
        story,
        behavior_script,
        image,
    })
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "npc_link - headless client for the NPC backend",
        "",
        "Usage:",
        "  npc_link [--base-url <url>] avatars",
        "  npc_link [--base-url <url>] init --name <name> [--background <text>] [--behavior <text>]",
        "           [--story <file>] [--behavior-script <file>] [--image <file>]",
        "  npc_link [--base-url <url>] chat <session_id>",
        "  npc_link fixtures [tomb|space_station|supermarket|supermarket_world]",
        "",
        "Defaults:",
        "  --base-url http://127.0.0.1:8000",
        "",
        "In chat, each stdin line is sent as one message; EOF ends the session.",
    ]
    .join("\n")
}
