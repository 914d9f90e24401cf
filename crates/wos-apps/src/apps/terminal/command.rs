//! Terminal Command Parsing
//!
//! Type-safe command representation for terminal input.

/// Parsed terminal command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Display help information
    Help,

    /// List a directory (defaults to the working directory)
    Ls { path: Option<String> },

    /// Change the working directory (defaults to /home)
    Cd { path: Option<String> },

    /// Print the working directory
    Pwd,

    /// Echo text back to the terminal
    Echo { text: String },

    /// Clear the terminal screen
    Clear,

    /// Show the current date and time
    Date,

    /// Show the current user
    Whoami,

    /// Print a file
    Cat { path: String },

    /// Create a directory
    Mkdir { path: String },

    /// Create an empty file (or truncate an existing one)
    Touch { path: String },

    /// Delete a file
    Rm { path: String },

    /// Show process summary
    Ps,

    /// Show memory statistics
    Mem,

    /// Show command history
    History,

    /// Exit the terminal
    Exit,

    /// Unrecognized command
    Unknown { cmd: String },
}

/// Error returned when parsing a command fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Command requires an argument that was not provided
    #[error("{command}: missing argument <{argument}>")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

/// Every command, in the order `help` lists them.
const USAGE: &[&str] = &[
    "ls [dir]      - List directory contents",
    "cd [dir]      - Change directory",
    "pwd           - Print working directory",
    "cat <file>    - Print file contents",
    "mkdir <dir>   - Create a directory",
    "touch <file>  - Create an empty file",
    "rm <file>     - Delete a file",
    "echo <text>   - Echo text",
    "ps            - Show processes",
    "mem           - Show memory usage",
    "date          - Show date and time",
    "whoami        - Show current user",
    "history       - Show command history",
    "clear         - Clear the screen",
    "help          - Show this help",
    "exit          - Exit the terminal",
];

fn required(
    args: &[&str],
    command: &'static str,
    argument: &'static str,
) -> Result<String, ParseError> {
    args.first()
        .map(|a| a.to_string())
        .ok_or(ParseError::MissingArgument { command, argument })
}

impl Command {
    /// Parse a command line into a Command.
    ///
    /// # Examples
    ///
    /// ```
    /// use wos_apps::apps::terminal::Command;
    ///
    /// assert_eq!(Command::parse("pwd"), Ok(Command::Pwd));
    /// assert_eq!(
    ///     Command::parse("cat notes.txt"),
    ///     Ok(Command::Cat { path: "notes.txt".to_string() })
    /// );
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (cmd, args) = match parts.split_first() {
            Some((c, a)) => (*c, a),
            None => return Ok(Command::Unknown { cmd: String::new() }),
        };

        match cmd {
            "help" | "?" => Ok(Command::Help),
            "ls" => Ok(Command::Ls {
                path: args.first().map(|a| a.to_string()),
            }),
            "cd" => Ok(Command::Cd {
                path: args.first().map(|a| a.to_string()),
            }),
            "pwd" => Ok(Command::Pwd),
            "echo" => Ok(Command::Echo {
                text: args.join(" "),
            }),
            "clear" | "cls" => Ok(Command::Clear),
            "date" => Ok(Command::Date),
            "whoami" => Ok(Command::Whoami),

            "cat" => required(args, "cat", "file").map(|path| Command::Cat { path }),
            "mkdir" => required(args, "mkdir", "dir").map(|path| Command::Mkdir { path }),
            "touch" => required(args, "touch", "file").map(|path| Command::Touch { path }),
            "rm" => required(args, "rm", "file").map(|path| Command::Rm { path }),

            "ps" => Ok(Command::Ps),
            "mem" => Ok(Command::Mem),
            "history" => Ok(Command::History),
            "exit" | "quit" => Ok(Command::Exit),

            _ => Ok(Command::Unknown {
                cmd: cmd.to_string(),
            }),
        }
    }

    /// Help text listing every command.
    pub fn help_text() -> String {
        let mut text = String::from("Available commands:");
        for line in USAGE {
            text.push_str("\n  ");
            text.push_str(line);
        }
        text
    }
}
