//! Rustyline helper: command completion, highlighting and hints.

use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use mtchat_application::TabKey;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::command::COMMANDS;

#[derive(Clone)]
pub struct CliHelper {
    commands: Vec<String>,
    tabs: Vec<String>,
}

impl CliHelper {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|(name, _)| name.to_string()).collect(),
            tabs: TabKey::all().map(|t| t.to_string()).collect(),
        }
    }

    fn candidates(&self, line: &str) -> (usize, Vec<&String>) {
        if let Some(arg) = line.strip_prefix("/tab ") {
            let start = line.len() - arg.len();
            return (start, self.tabs.iter().filter(|t| t.starts_with(arg)).collect());
        }
        if line.starts_with('/') && !line.contains(' ') {
            return (0, self.commands.iter().filter(|c| c.starts_with(line)).collect());
        }
        (0, Vec::new())
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, found) = self.candidates(&line[..pos]);
        let pairs = found
            .into_iter()
            .map(|c| Pair {
                display: c.clone(),
                replacement: c.clone(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        let (start, found) = self.candidates(line);
        let typed = &line[start..];
        found
            .into_iter()
            .find(|c| c.len() > typed.len())
            .map(|c| c[typed.len()..].to_string())
    }
}

impl Validator for CliHelper {}
