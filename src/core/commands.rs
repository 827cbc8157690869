use thiserror::Error;

pub const PREFIX: char = '~';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AddActivity,
    Complete,
    Clear,
    ViewActive,
    ViewCompleted,
    Leaderboard,
    Ask,
    Help,
}

/// Declared shape of one command: fixed leading tokens, plus optionally one
/// greedy trailing argument that consumes the rest of the line.
pub struct CommandSpec {
    pub command: Command,
    pub name: &'static str,
    pub fixed_args: usize,
    pub trailing: bool,
    pub usage: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: Command::AddActivity,
        name: "addactivity",
        fixed_args: 1,
        trailing: true,
        usage: "~addactivity <YYYY-MM-DD> <activity>",
    },
    CommandSpec {
        command: Command::Complete,
        name: "complete",
        fixed_args: 0,
        trailing: true,
        usage: "~complete <activity>",
    },
    CommandSpec {
        command: Command::Clear,
        name: "clear",
        fixed_args: 0,
        trailing: false,
        usage: "~clear",
    },
    CommandSpec {
        command: Command::ViewActive,
        name: "viewactive",
        fixed_args: 0,
        trailing: false,
        usage: "~viewactive",
    },
    CommandSpec {
        command: Command::ViewCompleted,
        name: "viewcompleted",
        fixed_args: 0,
        trailing: false,
        usage: "~viewcompleted",
    },
    CommandSpec {
        command: Command::Leaderboard,
        name: "leaderboard",
        fixed_args: 0,
        trailing: false,
        usage: "~leaderboard",
    },
    CommandSpec {
        command: Command::Ask,
        name: "ask",
        fixed_args: 0,
        trailing: true,
        usage: "~ask <question>",
    },
    CommandSpec {
        command: Command::Help,
        name: "help",
        fixed_args: 0,
        trailing: false,
        usage: "~help",
    },
];

#[derive(Debug, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub arg_text: &'a str,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    pub fixed: Vec<String>,
    pub trailing: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("Error: usage: {usage}")]
pub struct UsageError {
    pub usage: &'static str,
}

/// Splits prefixed message text into a command name and its raw argument
/// text. Returns None for anything that is not a command invocation.
pub fn parse_invocation(content: &str) -> Option<Invocation<'_>> {
    let rest = content.strip_prefix(PREFIX)?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().filter(|n| !n.is_empty())?;
    let arg_text = parts.next().unwrap_or("").trim_start();
    Some(Invocation { name, arg_text })
}

pub fn resolve(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

impl CommandSpec {
    /// Binds argument text to this command's declared shape. Missing
    /// arguments are a usage error; surplus tokens after a non-trailing
    /// command are ignored, matching common command-framework defaults.
    pub fn parse_args(&self, arg_text: &str) -> Result<Args, UsageError> {
        let mut rest = arg_text.trim_start();
        let mut fixed = Vec::with_capacity(self.fixed_args);

        for _ in 0..self.fixed_args {
            if rest.is_empty() {
                return Err(UsageError { usage: self.usage });
            }
            match rest.find(char::is_whitespace) {
                Some(i) => {
                    fixed.push(rest[..i].to_string());
                    rest = rest[i..].trim_start();
                }
                None => {
                    fixed.push(rest.to_string());
                    rest = "";
                }
            }
        }

        let trailing = if self.trailing {
            let text = rest.trim_end();
            if text.is_empty() {
                return Err(UsageError { usage: self.usage });
            }
            Some(text.to_string())
        } else {
            None
        };

        Ok(Args { fixed, trailing })
    }
}
