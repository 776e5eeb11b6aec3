//! Terminal command handling (/refresh, /auto, /complete, etc.).

/// A slash command typed into the terminal composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Help,
    Quit,
    Refresh,
    AutoRefresh(bool),
    List,
    /// Start the instance with this id
    Start(String),
    /// Stop the instance with this id
    Stop(String),
    /// Stop and forget every instance
    Clean,
    /// Run autocomplete on the text with the cursor at its end
    Complete(String),
    /// Render markdown and print the markup
    Render(String),
    /// Recognised command used wrongly; carries the usage line
    Usage(&'static str),
    Unknown(String),
}

/// Parse a line starting with '/'. Returns `None` for ordinary messages.
pub fn parse_command(input: &str) -> Option<UserCommand> {
    let s = input.trim_start();
    let cmdline = s.strip_prefix('/')?;

    // Keep the argument verbatim (including trailing spaces) for /complete.
    let (cmd, rest) = match cmdline.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest),
        None => (cmdline.trim_end(), ""),
    };

    let command = match cmd.to_lowercase().as_str() {
        "help" | "h" | "?" => UserCommand::Help,
        "quit" | "exit" | "q" => UserCommand::Quit,
        "refresh" | "r" => UserCommand::Refresh,
        "list" | "ls" => UserCommand::List,
        "clean" => UserCommand::Clean,
        "start" => single_arg(rest).map_or(
            UserCommand::Usage("Usage: /start <id>"),
            UserCommand::Start,
        ),
        "stop" => single_arg(rest).map_or(
            UserCommand::Usage("Usage: /stop <id>"),
            UserCommand::Stop,
        ),
        "auto" => match rest.trim() {
            "on" => UserCommand::AutoRefresh(true),
            "off" => UserCommand::AutoRefresh(false),
            _ => UserCommand::Usage("Usage: /auto on|off"),
        },
        "complete" | "c" => {
            if rest.is_empty() {
                UserCommand::Usage("Usage: /complete <text>")
            } else {
                UserCommand::Complete(rest.to_string())
            }
        }
        "render" => {
            if rest.trim().is_empty() {
                UserCommand::Usage("Usage: /render <markdown>")
            } else {
                // Allow literal "\n" so multi-line markdown fits on one line.
                UserCommand::Render(rest.replace("\\n", "\n"))
            }
        }
        other => UserCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Exactly one whitespace-separated argument.
fn single_arg(rest: &str) -> Option<String> {
    let mut args = rest.split_whitespace();
    match (args.next(), args.next()) {
        (Some(arg), None) => Some(arg.to_string()),
        _ => None,
    }
}

pub fn help_text() -> &'static str {
    "/help              Show this help\n\
     /quit              Exit\n\
     /refresh           Refresh the instance list now\n\
     /auto on|off       Toggle periodic instance refresh\n\
     /list              Show known instances\n\
     /start <id>        Start an instance\n\
     /stop <id>         Stop an instance\n\
     /clean             Stop every instance\n\
     /complete <text>   Show suggestions for <text> and complete the active one\n\
     /render <text>     Render markdown (\\n for new lines)\n\
     anything else      Send to every @mentioned instance"
}
