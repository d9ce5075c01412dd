//! Slash commands of the terminal client.

use mtchat_application::TabKey;

/// Every command, for completion and `/help`.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/login", "sign in with email and a one-time code"),
    ("/logout", "sign out"),
    ("/back", "re-enter the email address"),
    ("/cancel", "abandon the current step"),
    ("/list", "your entities, with images"),
    ("/create", "create an entity"),
    ("/categories", "active categories"),
    ("/search", "search entities: /search <text>"),
    ("/show", "open an entity: /show <id>"),
    ("/retry", "load the open entity again after a failure"),
    ("/shared", "open a shared entity: /shared <token>"),
    ("/tab", "load a tab of the open entity: /tab <name>"),
    ("/contact", "start a chat with the open entity's owner"),
    ("/request", "ask the owner for a missing attribute: /request <name>"),
    ("/status", "recent activity"),
    ("/help", "this list"),
];

/// One line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Logout,
    Back,
    Cancel,
    List,
    Create,
    Categories,
    Search(String),
    Show(String),
    Retry,
    Shared(String),
    Tab(TabKey),
    Contact,
    Request(String),
    Status,
    Help,
    Quit,
    /// Free text, interpreted by the current flow step.
    Text(String),
    /// A malformed command, with the reason.
    Invalid(String),
}

fn required(arg: &str, usage: &str) -> Result<String, String> {
    if arg.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(arg.to_string())
    }
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            return Command::Quit;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Text(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let parsed = match name {
            "login" => Ok(Command::Login),
            "logout" => Ok(Command::Logout),
            "back" => Ok(Command::Back),
            "cancel" => Ok(Command::Cancel),
            "list" => Ok(Command::List),
            "create" => Ok(Command::Create),
            "categories" => Ok(Command::Categories),
            "search" => Ok(Command::Search(arg.to_string())),
            "show" => required(arg, "/show <id>").map(Command::Show),
            "retry" => Ok(Command::Retry),
            "shared" => required(arg, "/shared <token>").map(Command::Shared),
            "tab" => arg.parse::<TabKey>().map(Command::Tab).map_err(|_| {
                let names: Vec<String> = TabKey::all().map(|t| t.to_string()).collect();
                format!("Unknown tab '{}'. Tabs: {}", arg, names.join(", "))
            }),
            "contact" => Ok(Command::Contact),
            "request" => required(arg, "/request <attribute>").map(Command::Request),
            "status" => Ok(Command::Status),
            "help" => Ok(Command::Help),
            other => Err(format!("Unknown command '/{other}'. Type /help.")),
        };
        parsed.unwrap_or_else(Command::Invalid)
    }
}
