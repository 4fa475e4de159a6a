//! Command lines for the child process.

use std::ffi::OsString;

/// Characters that make a single-string command line need a shell.
const SHELL_METACHARACTERS: &[char] = &[
    '*', '?', '{', '}', '[', ']', '<', '>', '(', ')', '~', '&', '|', '\\', '$', ';', '\'', '`',
    '"', '\n', '#', '=', '%',
];

/// Shell used for command lines that need one.
pub const SHELL: &str = "/bin/sh";

/// What to run in the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Program followed by its arguments, executed directly.
    Argv(Vec<OsString>),

    /// A line handed to `/bin/sh -c`.
    Shell(String),
}

impl CommandLine {
    /// Interpret a single command string.
    ///
    /// A string with no shell metacharacters is split on whitespace and run
    /// directly; anything else goes through `/bin/sh -c`.
    ///
    /// ```rust
    /// use ptyexpect::process::CommandLine;
    ///
    /// assert_eq!(
    ///     CommandLine::parse("/bin/cat -u"),
    ///     CommandLine::argv(["/bin/cat", "-u"]),
    /// );
    /// assert_eq!(
    ///     CommandLine::parse("echo ready; sleep 5"),
    ///     CommandLine::Shell("echo ready; sleep 5".to_string()),
    /// );
    /// ```
    pub fn parse(line: &str) -> Self {
        if line.contains(SHELL_METACHARACTERS) {
            CommandLine::Shell(line.to_string())
        } else {
            CommandLine::Argv(line.split_whitespace().map(OsString::from).collect())
        }
    }

    /// Build an argument vector.
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        CommandLine::Argv(args.into_iter().map(Into::into).collect())
    }

    /// The program that will be executed and its arguments, or `None` if
    /// there is nothing to run.
    pub fn program_and_args(&self) -> Option<(OsString, Vec<OsString>)> {
        match self {
            CommandLine::Argv(argv) => {
                let (program, args) = argv.split_first()?;
                Some((program.clone(), args.to_vec()))
            }
            CommandLine::Shell(line) if line.trim().is_empty() => None,
            CommandLine::Shell(line) => Some((
                OsString::from(SHELL),
                vec![OsString::from("-c"), OsString::from(line)],
            )),
        }
    }

    /// Append arguments. A shell line gets them single-quoted at its end.
    pub(crate) fn push_args<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        match self {
            CommandLine::Argv(argv) => argv.extend(extra.into_iter().map(Into::into)),
            CommandLine::Shell(line) => {
                let mut quoted = String::new();
                for arg in extra {
                    quoted.push(' ');
                    quoted.push_str(&shell_quote(&arg.into().to_string_lossy()));
                }
                if !quoted.is_empty() {
                    *line = format!("{line}{quoted}");
                }
            }
        }
    }

    /// Short form for log messages.
    pub fn display(&self) -> String {
        match self {
            CommandLine::Argv(argv) => argv
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" "),
            CommandLine::Shell(line) => format!("{SHELL} -c {line:?}"),
        }
    }
}

impl From<&str> for CommandLine {
    fn from(line: &str) -> Self {
        CommandLine::parse(line)
    }
}

impl From<String> for CommandLine {
    fn from(line: String) -> Self {
        CommandLine::parse(&line)
    }
}

fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_split() {
        let line = CommandLine::parse("  /bin/sh   -i ");
        assert_eq!(line, CommandLine::argv(["/bin/sh", "-i"]));
        let (program, args) = line.program_and_args().unwrap();
        assert_eq!(program, "/bin/sh");
        assert_eq!(args, vec![OsString::from("-i")]);
    }

    #[test]
    fn test_metacharacters_use_shell() {
        for line in ["sleep 10 &", "ls -s *.txt", "echo $HOME", "a | b", "sh -c 'x'"] {
            assert!(
                matches!(CommandLine::parse(line), CommandLine::Shell(_)),
                "{line}"
            );
        }
        let (program, args) = CommandLine::parse("echo hi; echo bye")
            .program_and_args()
            .unwrap();
        assert_eq!(program, SHELL);
        assert_eq!(args, vec![OsString::from("-c"), OsString::from("echo hi; echo bye")]);
    }

    #[test]
    fn test_empty_lines_have_no_program() {
        assert!(CommandLine::parse("   ").program_and_args().is_none());
        assert!(CommandLine::Shell(" ".into()).program_and_args().is_none());
        assert!(CommandLine::Argv(Vec::new()).program_and_args().is_none());
    }

    #[test]
    fn test_push_args() {
        let mut argv = CommandLine::parse("/bin/echo");
        argv.push_args(["a b"]);
        assert_eq!(argv, CommandLine::argv(["/bin/echo", "a b"]));

        let mut shell = CommandLine::parse(r"printf '%s\n'");
        shell.push_args(["it's"]);
        assert_eq!(shell, CommandLine::Shell(r"printf '%s\n' 'it'\''s'".to_string()));
    }
}
