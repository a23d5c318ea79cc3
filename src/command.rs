use thiserror::Error;

/// A parsed terminal command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    Ls(Option<String>),
    Mkdir(String),
    Touch(String),
    Cat(String),
    Rm(String),
    Cd(Option<String>),
    Python(Option<String>),
    PipInstall(String),
    Mv { from: String, to: String },
}

/// Input that does not form a valid command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{verb}: missing {what}")]
    MissingArgument { verb: &'static str, what: &'static str },
    #[error("pip: usage: pip install <package>")]
    PipUsage,
    #[error("unknown command: '{0}' (type help to list commands)")]
    Unknown(String),
}

/// Usage lines printed by `help`
pub const USAGE: &[&str] = &[
    "  python [file]       run Python code (no file = the open editor)",
    "  pip install <pkg>   install a Python package",
    "  ls [dir]            list files in a folder",
    "  mkdir <name>        create a folder",
    "  touch <name>        create a file and open it",
    "  cat <file>          print a file",
    "  rm <path>           remove a file or folder",
    "  mv <src> <dest>     move or rename a file or folder",
    "  cd [dir]            change folder",
    "  clear               clear the screen",
];

impl Command {
    /// Parse one whitespace-tokenized line. Extra arguments are ignored
    /// except for `pip`, which takes exactly `install <package>`.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let verb = tokens.next().unwrap_or_default();
        let args: Vec<String> = tokens.map(str::to_string).collect();
        let first = args.first().cloned();

        let required = |verb: &'static str, what: &'static str| {
            first.clone().ok_or(CommandError::MissingArgument { verb, what })
        };

        let command = match verb {
            "help" => Command::Help,
            "clear" => Command::Clear,
            "ls" => Command::Ls(first.clone()),
            "mkdir" => Command::Mkdir(required("mkdir", "folder name")?),
            "touch" => Command::Touch(required("touch", "file name")?),
            "cat" => Command::Cat(required("cat", "file name")?),
            "rm" => Command::Rm(required("rm", "file name")?),
            "cd" => Command::Cd(first.clone()),
            "python" => Command::Python(first.clone()),
            "pip" => match args.as_slice() {
                [sub, package] if sub == "install" => Command::PipInstall(package.clone()),
                _ => return Err(CommandError::PipUsage),
            },
            "mv" => match args.as_slice() {
                [from, to, ..] => Command::Mv { from: from.clone(), to: to.clone() },
                _ => {
                    return Err(CommandError::MissingArgument {
                        verb: "mv",
                        what: "source and destination",
                    })
                }
            },
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Clear => "clear",
            Command::Ls(_) => "ls",
            Command::Mkdir(_) => "mkdir",
            Command::Touch(_) => "touch",
            Command::Cat(_) => "cat",
            Command::Rm(_) => "rm",
            Command::Cd(_) => "cd",
            Command::Python(_) => "python",
            Command::PipInstall(_) => "pip",
            Command::Mv { .. } => "mv",
        }
    }
}
