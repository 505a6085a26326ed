// CLI binary: panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use parking_lot::Mutex;

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

use chainline::interpreter::{ChainSender, Diagnostic, Interpreter};
use chainline::registry::{ArgKind, CommandSpec};
use chainline::{logging, paths, settings};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "chainline", about = "Chained slash-command interpreter", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Character that starts a command (default '/')
    #[arg(long, global = true)]
    prefix: Option<char>,

    /// Character that chains commands (default '&')
    #[arg(long, global = true)]
    separator: Option<char>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command chain, e.g. "/model big & /sleep 1 & /status"
    Run {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        chain: Vec<String>,
    },
    /// Read command chains from stdin, one per line
    Repl,
    /// Alias management
    Alias {
        #[command(subcommand)]
        action: AliasAction,
    },
    /// Show the help text, optionally filtered
    Help { filter: Option<String> },
    /// Write the help text to a markdown file
    Doc { path: PathBuf },
    /// Command palette: list entries or pick one
    Palette {
        #[command(subcommand)]
        action: Option<PaletteAction>,
    },
}

#[derive(Subcommand)]
enum PaletteAction {
    /// List entries, most recently used first (the default)
    List,
    /// Run one entry and record it as most recently used
    Run {
        name: String,
        #[arg(num_args = 0.., allow_hyphen_values = true)]
        argument: Vec<String>,
    },
}

#[derive(Subcommand)]
enum AliasAction {
    /// Define or replace an alias
    Set {
        name: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Remove an alias
    Unset { name: String },
    /// Show one alias
    Get { name: String },
    /// List all aliases
    List,
}

// ── Host state ───────────────────────────────────────────────────

/// What the demo commands act on: a stand-in for a chat session.
struct HostState {
    model: String,
    temperature: f64,
    max_tokens: i64,
    transcript: Vec<String>,
    quit: bool,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: 1024,
            transcript: Vec::new(),
            quit: false,
        }
    }
}

const DEFAULT_TEMPERATURE: f64 = 0.7;

type Host = Arc<Mutex<HostState>>;

fn host_commands(host: &Host, sender: &ChainSender) -> Vec<CommandSpec> {
    let mut specs = Vec::new();

    let h = Arc::clone(host);
    specs.push(
        CommandSpec::new("model", "Change the model", move |arg| {
            if let Some(name) = arg.as_text() {
                h.lock().model = name.to_string();
                println!("Model: {name}");
            }
        })
        .required(ArgKind::Text),
    );

    let h = Arc::clone(host);
    specs.push(
        CommandSpec::new("temp", "Set the temperature", move |arg| {
            let value = arg.as_float().unwrap_or(DEFAULT_TEMPERATURE);
            h.lock().temperature = value;
            println!("Temperature: {value}");
        })
        .optional(ArgKind::Float)
        .extra("Without an argument the default is restored."),
    );

    let h = Arc::clone(host);
    specs.push(
        CommandSpec::new("tokens", "Set the max tokens", move |arg| {
            if let Some(value) = arg.as_integer() {
                h.lock().max_tokens = value;
                println!("Max tokens: {value}");
            }
        })
        .required(ArgKind::Integer),
    );

    let h = Arc::clone(host);
    specs.push(
        CommandSpec::new("print", "Print a message", move |arg| {
            if let Some(text) = arg.as_text() {
                h.lock().transcript.push(text.to_string());
                println!("{text}");
            }
        })
        .required(ArgKind::Text),
    );

    let h = Arc::clone(host);
    specs.push(
        CommandSpec::new("clear", "Clear the transcript", move |arg| {
            let mut state = h.lock();
            if state.transcript.is_empty() || arg.is_forced() {
                state.transcript.clear();
                println!("Transcript cleared");
            } else {
                println!("Transcript has {} lines. Use 'clear force' to drop them.", state.transcript.len());
            }
        })
        .optional(ArgKind::Force)
        .extra("Use 'force' to skip the confirmation."),
    );

    let h = Arc::clone(host);
    specs.push(CommandSpec::new("status", "Show the current session settings", move |_| {
        let state = h.lock();
        println!(
            "model={} temperature={} max_tokens={} transcript={}",
            state.model,
            state.temperature,
            state.max_tokens,
            state.transcript.len()
        );
    }));

    let s = sender.clone();
    specs.push(
        CommandSpec::new("chain", "Run the argument as a command chain", move |arg| {
            if let Some(text) = arg.as_text() {
                s.send(text);
            }
        })
        .required(ArgKind::Text)
        .extra("Use ((prefix)) for the command prefix, e.g. `chain ((prefix))print hi`."),
    );

    let h = Arc::clone(host);
    specs.push(CommandSpec::new("quit", "Exit the program", move |_| {
        h.lock().quit = true;
    }));

    specs
}

fn report_diagnostic(diagnostic: &Diagnostic) {
    match diagnostic {
        Diagnostic::Dropped { name, .. } => eprintln!("Unknown command: {name}"),
        Diagnostic::Rejected { name, reason } => eprintln!("{name}: {reason}"),
        Diagnostic::TooDeep { name, .. } => eprintln!("Alias nested too deeply: {name}"),
        Diagnostic::BadSleep { argument, .. } => eprintln!("Invalid sleep duration: {argument}"),
    }
}

// ── Tick loop ────────────────────────────────────────────────────

struct Clock {
    ticker: Interval,
    last: Instant,
}

impl Clock {
    fn new(interp: &Interpreter) -> Self {
        let mut ticker = interval(interp.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker,
            last: Instant::now(),
        }
    }

    fn step(&mut self, interp: &mut Interpreter) {
        let now = Instant::now();
        interp.tick(now.duration_since(self.last));
        self.last = now;
    }
}

async fn drain(interp: &mut Interpreter, clock: &mut Clock, host: &Host) {
    while !interp.is_idle() && !host.lock().quit {
        clock.ticker.tick().await;
        clock.step(interp);
    }
}

async fn run_chain(interp: &mut Interpreter, host: &Host, text: &str) {
    if !interp.execute_chain(text, None) {
        eprintln!("Error: not a command chain: {text}");
        process::exit(1);
    }
    let mut clock = Clock::new(interp);
    drain(interp, &mut clock, host).await;
}

async fn repl(interp: &mut Interpreter, host: &Host) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut clock = Clock::new(interp);

    loop {
        if host.lock().quit {
            return;
        }
        tokio::select! {
            _ = clock.ticker.tick() => clock.step(interp),
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(interp, host, line.trim()),
                Ok(None) => break,
                Err(e) => {
                    eprintln!("Error reading stdin: {e}");
                    break;
                }
            },
        }
    }

    // Let chains typed before EOF finish.
    drain(interp, &mut clock, host).await;
}

fn handle_line(interp: &mut Interpreter, host: &Host, line: &str) {
    if line.is_empty() {
        return;
    }
    if interp.is_command_text(line) {
        interp.execute_chain(line, None);
    } else {
        host.lock().transcript.push(line.to_string());
    }
}

// ── Non-scheduling subcommands ───────────────────────────────────

fn run_alias(interp: &mut Interpreter, action: AliasAction, raw_json: bool) {
    let prefix = interp.settings().command_prefix;
    match action {
        AliasAction::Set { name, value } => {
            let value = value.join(" ");
            if let Err(e) = interp.set_alias(&format!("{name} {value}")) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            println!("Set alias: {prefix}{name} is now {value}");
        }
        AliasAction::Unset { name } => {
            if let Err(e) = interp.unset_alias(&name) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            println!("Unset alias: {name}");
        }
        AliasAction::Get { name } => match interp.get_alias(&name) {
            Some(value) => println!("Alias: {name} is {value}"),
            None => {
                eprintln!("Alias not found: {name}");
                process::exit(1);
            }
        },
        AliasAction::List => {
            if raw_json {
                let table: IndexMap<&str, &str> = interp.aliases().iter().collect();
                println!("{}", serde_json::to_string_pretty(&table).unwrap_or_default());
                return;
            }
            if interp.aliases().is_empty() {
                println!("No aliases");
            }
            for (name, value) in interp.aliases().iter() {
                println!("{prefix}{name} = {value}");
            }
        }
    }
}

fn print_palette(interp: &Interpreter, raw_json: bool) {
    let rows = interp.palette();
    if raw_json {
        println!("{}", serde_json::to_string_pretty(&rows).unwrap_or_default());
        return;
    }
    for row in rows {
        let marker = if row.needs_argument { " <arg>" } else { "" };
        println!("{:<10} {}{marker}", row.tooltip, row.label);
    }
}

async fn run_palette_entry(interp: &mut Interpreter, host: &Host, name: &str, argument: &str) {
    if !interp.execute(name, argument, true) {
        eprintln!("Error: '{name}' did not run");
        process::exit(1);
    }
    // The entry may have queued a follow-up chain.
    let mut clock = Clock::new(interp);
    drain(interp, &mut clock, host).await;
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("{e}");
    }

    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
    let mut config = settings::load_settings(&config_dir).unwrap_or_default();
    if let Some(prefix) = cli.prefix {
        config.command_prefix = prefix;
    }
    if let Some(separator) = cli.separator {
        config.chain_separator = separator;
    }

    let host: Host = Arc::default();
    let sender = ChainSender::default();
    let mut interp = match Interpreter::open(config, &config_dir, host_commands(&host, &sender)) {
        Ok(interp) => interp.with_sender(sender),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    interp.set_diagnostics(Box::new(report_diagnostic));

    match cli.command {
        Commands::Run { chain } => run_chain(&mut interp, &host, &chain.join(" ")).await,
        Commands::Repl => repl(&mut interp, &host).await,
        Commands::Alias { action } => run_alias(&mut interp, action, cli.json),
        Commands::Help { filter } => println!("{}", interp.describe_all(filter.as_deref())),
        Commands::Doc { path } => {
            if let Err(e) = interp.write_command_doc(&path) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        Commands::Palette { action } => match action {
            None | Some(PaletteAction::List) => print_palette(&interp, cli.json),
            Some(PaletteAction::Run { name, argument }) => {
                run_palette_entry(&mut interp, &host, &name, &argument.join(" ")).await;
            }
        },
    }
}
