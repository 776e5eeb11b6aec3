//! mention-relay - terminal client for a multi-instance chat session manager
//!
//! Architecture:
//! - Main thread: reads composer lines from stdin
//! - Printer thread: prints backend events as they arrive
//! - Backend thread: runs a Tokio runtime for dispatch and directory polling
//! - Communication via crossbeam channels (lock-free, sync-safe)

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use chrono::Local;
use clap::Parser;
use crossbeam_channel::Receiver;

use mention_relay::commands::{help_text, parse_command, UserCommand};
use mention_relay::config::{self, Settings};
use mention_relay::directory::Directory;
use mention_relay::lifecycle::LifecycleRequest;
use mention_relay::logging::init_tracing;
use mention_relay::markdown::render_markdown;
use mention_relay::presentation::PresentationKind;
use mention_relay::protocol::{BackendAction, GuiEvent};
use mention_relay::session::AttachedSession;

#[derive(Parser, Debug)]
#[command(version, about = "Relay @mentioned messages to chat session instances")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session manager base URL
    #[arg(long)]
    server: Option<String>,

    /// Marker word in mention tokens (@<marker><id>)
    #[arg(long)]
    marker: Option<String>,

    /// Disable periodic instance refresh
    #[arg(long)]
    no_auto_refresh: bool,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,

    /// Render a markdown file to stdout and exit
    #[arg(long, value_name = "FILE")]
    render: Option<PathBuf>,
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn load_settings(cli: &Cli) -> mention_relay::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => config::load_settings_from(path)?,
        None => config::load_settings().unwrap_or_default(),
    };
    if let Some(server) = &cli.server {
        settings.server_url = server.clone();
    }
    if let Some(marker) = &cli.marker {
        settings.marker_word = marker.clone();
    }
    if cli.no_auto_refresh {
        settings.auto_refresh = false;
    }
    settings.validate()?;
    Ok(settings)
}

fn print_events(events: Receiver<GuiEvent>) {
    while let Ok(event) = events.recv() {
        let ts = timestamp();
        match event {
            GuiEvent::Present { kind, content } => match kind {
                PresentationKind::Notice => println!("[{}] ! {}", ts, content),
                PresentationKind::Rendered => println!("{}", content),
                PresentationKind::Suggestions | PresentationKind::Outbound => {
                    println!("[{}] {}", ts, content)
                }
            },
            GuiEvent::DirectoryUpdated(count) => {
                tracing::debug!("directory refreshed: {} instances", count)
            }
            GuiEvent::DispatchFinished(report) => {
                let total = report.outcomes.len();
                println!(
                    "[{}] delivered to {}/{} recipient(s)",
                    ts,
                    report.success_count(),
                    total
                );
            }
            GuiEvent::Error(msg) => println!("[{}] ! {}", ts, msg),
            GuiEvent::Stopped => break,
        }
    }
}

fn main() -> ExitCode {
    init_tracing("warn");
    let cli = Cli::parse();

    if let Some(path) = &cli.render {
        return match std::fs::read_to_string(path) {
            Ok(content) => {
                println!("{}", render_markdown(&content));
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to read {}: {}", path.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.save_config {
        let saved = match &cli.config {
            Some(path) => config::save_settings_to(&settings, path),
            None => config::save_settings(&settings),
        };
        if let Err(e) = saved {
            eprintln!("Failed to save settings: {}", e);
        }
    }

    let mut attached = match AttachedSession::attach(&settings) {
        Ok(attached) => attached,
        Err(e) => {
            eprintln!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let events = attached.events().clone();
    let printer = thread::spawn(move || print_events(events));

    println!("mention-relay ({})", settings.server_url);
    println!(
        "Address instances with @{}<id>. Type /help for commands, /quit to exit.\n",
        settings.marker_word
    );

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        if let Some(cmd) = parse_command(&line) {
            match cmd {
                UserCommand::Quit => break,
                UserCommand::Help => println!("{}", help_text()),
                UserCommand::Refresh => attached.send_action(BackendAction::RefreshDirectory),
                UserCommand::AutoRefresh(on) => {
                    attached.send_action(BackendAction::SetAutoRefresh(on))
                }
                UserCommand::List => {
                    let recipients = attached.session.directory().snapshot();
                    if recipients.is_empty() {
                        println!("no instances available");
                    }
                    for r in recipients {
                        let detail = r.detail.as_deref().unwrap_or("no description");
                        println!("  {} - {}", r.id, detail);
                    }
                }
                UserCommand::Start(id) => match LifecycleRequest::start(&id) {
                    Ok(request) => attached.request_lifecycle(request),
                    Err(e) => println!("[{}] ! {}", timestamp(), e),
                },
                UserCommand::Stop(id) => match LifecycleRequest::stop(&id) {
                    Ok(request) => attached.request_lifecycle(request),
                    Err(e) => println!("[{}] ! {}", timestamp(), e),
                },
                UserCommand::Clean => attached.request_lifecycle(LifecycleRequest::CleanAll),
                UserCommand::Complete(text) => {
                    let cursor = text.len();
                    attached.session.edit(text, cursor);
                    if !attached.show_suggestions() {
                        println!("(no mention at cursor)");
                        continue;
                    }
                    if attached.session.accept_suggestion() {
                        println!("=> {}", attached.session.input());
                    }
                    attached.session.edit(String::new(), 0);
                }
                UserCommand::Render(text) => println!("{}", render_markdown(&text)),
                UserCommand::Usage(usage) => println!("{}", usage),
                UserCommand::Unknown(cmd) => {
                    println!("Unknown command: /{} (try /help)", cmd)
                }
            }
            continue;
        }

        let cursor = line.len();
        attached.session.edit(line.clone(), cursor);
        if let Err(e) = attached.submit() {
            println!("[{}] ! {}", timestamp(), e);
        }
        let _ = io::stdout().flush();
    }

    attached.detach();
    let _ = printer.join();
    ExitCode::SUCCESS
}
