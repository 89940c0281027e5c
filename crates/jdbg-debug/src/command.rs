//! Operator command parsing.

use crate::error::CommandError;

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Run,
    Locals,
    Globals,
    SetBreakpoint(u32),
    RemoveBreakpoint(u32),
    ListBreakpoints,
    EnableBreakpoint(u32),
    DisableBreakpoint(u32),
    StepOver,
    StepInto,
    PrintValue { name: String, index: Option<usize> },
    PrintField { name: String, field: String },
    ShowState,
    StackTrace,
    MethodEntry,
    Help,
}

/// Text printed by `help`.
pub const HELP_TEXT: &str = "\
Commands:
  run (r, c, continue)              start or resume the program
  quit (q, exit)                    terminate the program and the session
  set-breakpoint <line> (break, b)  break at a source line
  remove-breakpoint <line> (delete, d)
  list-breakpoints (breakpoints, bl)
  enable-breakpoint <line>
  disable-breakpoint <line>
  step-over (next, n, step)         run to the next line
  step-into (into, s)               run to the next line, entering calls
  locals                            show visible local variables
  globals                           show fields of the current class
  print-value <var> [<idx>] (print, p)
  print-field <var> <field> (field, pf)
  show-state (state, list, l)       show the source with the current line
  stack-trace (where, bt)           show the frames of the halted thread
  method-entry (entry)              toggle breaking on method entry
  help (h, ?)                       show this text";

impl Command {
    /// Parse one input line: a verb, then whitespace-separated arguments.
    pub fn parse(input: &str) -> Result<Command, CommandError> {
        let mut words = input.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let command = match verb {
            "quit" | "q" | "exit" => {
                no_args(&args, "quit")?;
                Command::Quit
            }
            "run" | "r" | "c" | "continue" => {
                no_args(&args, "run")?;
                Command::Run
            }
            "locals" => {
                no_args(&args, "locals")?;
                Command::Locals
            }
            "globals" => {
                no_args(&args, "globals")?;
                Command::Globals
            }
            "set-breakpoint" | "break" | "b" => {
                Command::SetBreakpoint(line_arg(&args, "set-breakpoint <line>")?)
            }
            "remove-breakpoint" | "delete" | "d" => {
                Command::RemoveBreakpoint(line_arg(&args, "remove-breakpoint <line>")?)
            }
            "list-breakpoints" | "breakpoints" | "bl" => {
                no_args(&args, "list-breakpoints")?;
                Command::ListBreakpoints
            }
            "enable-breakpoint" => {
                Command::EnableBreakpoint(line_arg(&args, "enable-breakpoint <line>")?)
            }
            "disable-breakpoint" => {
                Command::DisableBreakpoint(line_arg(&args, "disable-breakpoint <line>")?)
            }
            "step-over" | "next" | "n" | "step" => {
                no_args(&args, "step-over")?;
                Command::StepOver
            }
            "step-into" | "into" | "s" => {
                no_args(&args, "step-into")?;
                Command::StepInto
            }
            "print-value" | "print" | "p" => {
                const USAGE: &str = "print-value <var> [<idx>]";
                match args.as_slice() {
                    [name] => Command::PrintValue {
                        name: name.to_string(),
                        index: None,
                    },
                    [name, index] => Command::PrintValue {
                        name: name.to_string(),
                        index: Some(
                            index
                                .parse::<usize>()
                                .map_err(|_| CommandError::BadIndex(index.to_string()))?,
                        ),
                    },
                    _ => return Err(CommandError::ArgumentCount { usage: USAGE }),
                }
            }
            "print-field" | "field" | "pf" => match args.as_slice() {
                [name, field] => Command::PrintField {
                    name: name.to_string(),
                    field: field.to_string(),
                },
                _ => {
                    return Err(CommandError::ArgumentCount {
                        usage: "print-field <var> <field>",
                    })
                }
            },
            "show-state" | "state" | "list" | "l" => {
                no_args(&args, "show-state")?;
                Command::ShowState
            }
            "stack-trace" | "where" | "bt" => {
                no_args(&args, "stack-trace")?;
                Command::StackTrace
            }
            "method-entry" | "entry" => {
                no_args(&args, "method-entry")?;
                Command::MethodEntry
            }
            "help" | "h" | "?" => Command::Help,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn no_args(args: &[&str], usage: &'static str) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::ArgumentCount { usage })
    }
}

fn line_arg(args: &[&str], usage: &'static str) -> Result<u32, CommandError> {
    let [arg] = args else {
        return Err(CommandError::ArgumentCount { usage });
    };
    match arg.parse::<u32>() {
        Ok(line) if line > 0 => Ok(line),
        _ => Err(CommandError::BadLine(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parse_verbs_and_aliases() {
        assert_eq!(Command::parse("quit"), Ok(Command::Quit));
        assert_eq!(Command::parse("q"), Ok(Command::Quit));
        assert_eq!(Command::parse("run"), Ok(Command::Run));
        assert_eq!(Command::parse("continue"), Ok(Command::Run));
        assert_eq!(Command::parse("locals"), Ok(Command::Locals));
        assert_eq!(Command::parse("globals"), Ok(Command::Globals));
        assert_eq!(Command::parse("step"), Ok(Command::StepOver));
        assert_eq!(Command::parse("step-into"), Ok(Command::StepInto));
        assert_eq!(Command::parse("bl"), Ok(Command::ListBreakpoints));
        assert_eq!(Command::parse("where"), Ok(Command::StackTrace));
        assert_eq!(Command::parse("entry"), Ok(Command::MethodEntry));
        assert_eq!(Command::parse("l"), Ok(Command::ShowState));
        assert_eq!(Command::parse("?"), Ok(Command::Help));
    }

    #[test]
    fn command_parse_breakpoint_lines() {
        assert_eq!(Command::parse("break 12"), Ok(Command::SetBreakpoint(12)));
        assert_eq!(
            Command::parse("remove-breakpoint  3"),
            Ok(Command::RemoveBreakpoint(3))
        );
        assert_eq!(
            Command::parse("disable-breakpoint 4"),
            Ok(Command::DisableBreakpoint(4))
        );
    }

    #[test]
    fn command_parse_bad_line_numbers() {
        assert_eq!(
            Command::parse("break x"),
            Err(CommandError::BadLine("x".into()))
        );
        assert_eq!(
            Command::parse("break -2"),
            Err(CommandError::BadLine("-2".into()))
        );
        assert_eq!(
            Command::parse("break 0"),
            Err(CommandError::BadLine("0".into()))
        );
        assert!(matches!(
            Command::parse("break"),
            Err(CommandError::ArgumentCount { .. })
        ));
        assert!(matches!(
            Command::parse("break 1 2"),
            Err(CommandError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn command_parse_print_value() {
        assert_eq!(
            Command::parse("print-value x"),
            Ok(Command::PrintValue {
                name: "x".into(),
                index: None
            })
        );
        assert_eq!(
            Command::parse("p x 2"),
            Ok(Command::PrintValue {
                name: "x".into(),
                index: Some(2)
            })
        );
        assert_eq!(
            Command::parse("p x two"),
            Err(CommandError::BadIndex("two".into()))
        );
        assert_eq!(
            Command::parse("p x -1"),
            Err(CommandError::BadIndex("-1".into()))
        );
        assert!(Command::parse("p").is_err());
    }

    #[test]
    fn command_parse_print_field() {
        assert_eq!(
            Command::parse("print-field dog age"),
            Ok(Command::PrintField {
                name: "dog".into(),
                field: "age".into()
            })
        );
        assert!(Command::parse("pf dog").is_err());
    }

    #[test]
    fn command_unknown_verb() {
        assert_eq!(
            Command::parse("jump 3"),
            Err(CommandError::Unknown("jump".into()))
        );
    }

    #[test]
    fn command_extra_args_rejected() {
        assert!(matches!(
            Command::parse("locals now"),
            Err(CommandError::ArgumentCount { usage: "locals" })
        ));
    }

    #[test]
    fn command_help_lists_every_verb() {
        for verb in [
            "run",
            "quit",
            "set-breakpoint",
            "remove-breakpoint",
            "list-breakpoints",
            "step-over",
            "step-into",
            "locals",
            "globals",
            "print-value",
            "print-field",
            "show-state",
            "stack-trace",
            "method-entry",
            "help",
        ] {
            assert!(HELP_TEXT.contains(verb), "help misses {verb}");
        }
    }
}
