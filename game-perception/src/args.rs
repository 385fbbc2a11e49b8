use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Screenshot,
    State,
    Status,
    Find(String),
    Watch,
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub config_path: Option<PathBuf>,
    pub template_root: Option<PathBuf>,
    pub annotate_path: Option<PathBuf>,
    pub strict: bool,
    pub debug_mode: bool,
    pub timeout_secs: Option<u64>,
}

impl Args {
    pub fn parse() -> Option<Self> {
        let args: Vec<String> = env::args().collect();
        Self::parse_from(args.iter().skip(1).map(String::as_str))
    }

    fn parse_from<'a>(args: impl Iterator<Item = &'a str>) -> Option<Self> {
        let mut mode: Option<Mode> = None;
        let mut config_path: Option<PathBuf> = None;
        let mut template_root: Option<PathBuf> = None;
        let mut annotate_path: Option<PathBuf> = None;
        let mut strict = false;
        let mut debug_mode = false;
        let mut timeout_secs: Option<u64> = None;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!("Game Perception v{}", env!("CARGO_PKG_VERSION"));
                return None;
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--strict" {
                strict = true;
            } else if arg == "--screenshot" || arg == "-s" {
                mode = Some(Mode::Screenshot);
            } else if arg == "--state" {
                mode = Some(Mode::State);
            } else if arg == "--status" {
                mode = Some(Mode::Status);
            } else if arg == "--watch" || arg == "-w" {
                mode = Some(Mode::Watch);
            } else if let Some(name) = arg.strip_prefix("--find=") {
                if name.is_empty() {
                    eprintln!("❌ --find needs a template name");
                    return None;
                }
                mode = Some(Mode::Find(name.to_string()));
            } else if let Some(path) = arg.strip_prefix("--config=") {
                config_path = Some(PathBuf::from(path));
            } else if let Some(path) = arg.strip_prefix("--templates=") {
                template_root = Some(PathBuf::from(path));
            } else if let Some(path) = arg.strip_prefix("--annotate=") {
                annotate_path = Some(PathBuf::from(path));
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                match val.parse::<u64>() {
                    Ok(secs) => timeout_secs = Some(secs),
                    Err(_) => {
                        eprintln!("❌ Invalid timeout value: {}", val);
                        return None;
                    }
                }
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(Args {
            mode: mode.unwrap_or(Mode::State),
            config_path,
            template_root,
            annotate_path,
            strict,
            debug_mode,
            timeout_secs,
        })
    }
}

fn print_help() {
    println!("🎮 Game Perception");
    println!();
    println!("USAGE:");
    println!("    game-perception [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)          Classify the current game state once");
    println!("    --state             Classify the current game state once");
    println!("    --status            Read health, mana and poison once");
    println!("    --find=<template>   Locate a template, e.g. --find=hud/belt");
    println!("    --watch, -w         Poll gauges at 10 Hz and report state changes");
    println!("    --screenshot, -s    Capture the game window to screenshot.png");
    println!("    --config=<file>     Load settings from a JSON file");
    println!("    --templates=<dir>   Template root (default: assets/templates)");
    println!("    --annotate=<file>   With --find: save the frame with matches outlined");
    println!("    --strict            No frame cache, no desktop fallback when the window is missing");
    println!("    --timeout=N         With --watch: exit after N seconds");
    println!("    --debug             Enable debug logging");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    game-perception --status");
    println!("    game-perception --find=screens/main_menu --annotate=found.png");
    println!("    game-perception --watch --timeout=30 --config=perception.json");
}
