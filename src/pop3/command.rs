use core::fmt::{self, Display, Formatter};

use thiserror::Error;

use super::State;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unrecognised command")]
    Unrecognised,

    #[error("missing {0} argument")]
    MissingArgument(&'static str),

    #[error("invalid message number: {0:?}")]
    InvalidNumber(String),

    #[error("invalid line count: {0:?}")]
    InvalidLineCount(String),
}

/// One parsed client command. Message numbers are the client-visible
/// 1-based session positions, validated here only for shape (a positive
/// integer); range and deletion checks happen against the snapshot.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    User(String),
    Pass(String),
    Stat,
    List(Option<usize>),
    Uidl(Option<usize>),
    Top(usize, usize),
    Retr(usize),
    Dele(usize),
    Rset,
    Noop,
    Quit,
}

impl Command {
    /// The phase a command is legal in, or `None` for commands legal in
    /// any phase. The session checks this in one place instead of per
    /// handler.
    #[must_use]
    pub const fn required_state(&self) -> Option<State> {
        match self {
            Self::User(_) | Self::Pass(_) => Some(State::Unauthorized),
            Self::Stat
            | Self::List(_)
            | Self::Uidl(_)
            | Self::Top(..)
            | Self::Retr(_)
            | Self::Dele(_) => Some(State::Transaction),
            Self::Rset | Self::Noop | Self::Quit => None,
        }
    }
}

impl Display for Command {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(name) => fmt.write_fmt(format_args!("USER {name}")),
            // never echo credentials, even though we don't check them
            Self::Pass(_) => fmt.write_str("PASS ****"),
            Self::Stat => fmt.write_str("STAT"),
            Self::List(None) => fmt.write_str("LIST"),
            Self::List(Some(n)) => fmt.write_fmt(format_args!("LIST {n}")),
            Self::Uidl(None) => fmt.write_str("UIDL"),
            Self::Uidl(Some(n)) => fmt.write_fmt(format_args!("UIDL {n}")),
            Self::Top(n, lines) => fmt.write_fmt(format_args!("TOP {n} {lines}")),
            Self::Retr(n) => fmt.write_fmt(format_args!("RETR {n}")),
            Self::Dele(n) => fmt.write_fmt(format_args!("DELE {n}")),
            Self::Rset => fmt.write_str("RSET"),
            Self::Noop => fmt.write_str("NOOP"),
            Self::Quit => fmt.write_str("QUIT"),
        }
    }
}

fn message_number(arg: &str) -> Result<usize, CommandError> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CommandError::InvalidNumber(arg.to_string())),
    }
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or("").to_ascii_uppercase();
        let first = words.next();
        let second = words.next();

        match keyword.as_str() {
            "USER" => first
                .map(|name| Self::User(name.to_string()))
                .ok_or(CommandError::MissingArgument("user name")),
            "PASS" => first
                .map(|pass| Self::Pass(pass.to_string()))
                .ok_or(CommandError::MissingArgument("password")),
            "STAT" => Ok(Self::Stat),
            "LIST" => first.map(message_number).transpose().map(Self::List),
            "UIDL" => first.map(message_number).transpose().map(Self::Uidl),
            "TOP" => {
                let n =
                    message_number(first.ok_or(CommandError::MissingArgument("message number"))?)?;
                let lines = second.ok_or(CommandError::MissingArgument("line count"))?;
                let lines = lines
                    .parse::<usize>()
                    .map_err(|_| CommandError::InvalidLineCount(lines.to_string()))?;
                Ok(Self::Top(n, lines))
            }
            "RETR" => message_number(
                first.ok_or(CommandError::MissingArgument("message number"))?,
            )
            .map(Self::Retr),
            "DELE" => message_number(
                first.ok_or(CommandError::MissingArgument("message number"))?,
            )
            .map(Self::Dele),
            "RSET" => Ok(Self::Rset),
            "NOOP" => Ok(Self::Noop),
            "QUIT" => Ok(Self::Quit),
            _ => Err(CommandError::Unrecognised),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        for line in ["STAT", "stat", "Stat", "sTaT"] {
            assert_eq!(Command::try_from(line), Ok(Command::Stat));
        }

        assert_eq!(
            Command::try_from("user jim"),
            Ok(Command::User(String::from("jim")))
        );
    }

    #[test]
    fn trailing_line_endings_are_ignored() {
        assert_eq!(Command::try_from("NOOP\r\n"), Ok(Command::Noop));
        assert_eq!(
            Command::try_from("RETR 2\r\n"),
            Ok(Command::Retr(2))
        );
    }

    #[test]
    fn list_and_uidl_take_an_optional_number() {
        assert_eq!(Command::try_from("LIST"), Ok(Command::List(None)));
        assert_eq!(Command::try_from("LIST 3"), Ok(Command::List(Some(3))));
        assert_eq!(Command::try_from("UIDL"), Ok(Command::Uidl(None)));
        assert_eq!(Command::try_from("UIDL 1"), Ok(Command::Uidl(Some(1))));
    }

    #[test]
    fn message_numbers_must_be_positive_integers() {
        for line in ["RETR 0", "RETR -1", "RETR x", "LIST 0", "DELE nope"] {
            assert!(
                matches!(Command::try_from(line), Err(CommandError::InvalidNumber(_))),
                "{line:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_arguments_are_reported() {
        assert_eq!(
            Command::try_from("USER"),
            Err(CommandError::MissingArgument("user name"))
        );
        assert_eq!(
            Command::try_from("RETR"),
            Err(CommandError::MissingArgument("message number"))
        );
        assert_eq!(
            Command::try_from("TOP 1"),
            Err(CommandError::MissingArgument("line count"))
        );
    }

    #[test]
    fn top_takes_a_number_and_a_line_count() {
        assert_eq!(Command::try_from("TOP 2 10"), Ok(Command::Top(2, 10)));
        assert_eq!(Command::try_from("TOP 2 0"), Ok(Command::Top(2, 0)));
        assert!(matches!(
            Command::try_from("TOP 2 ten"),
            Err(CommandError::InvalidLineCount(_))
        ));
    }

    #[test]
    fn unknown_commands_are_unrecognised() {
        assert_eq!(Command::try_from("EHLO hi"), Err(CommandError::Unrecognised));
        assert_eq!(Command::try_from(""), Err(CommandError::Unrecognised));
    }

    #[test]
    fn passwords_never_display() {
        let command = Command::try_from("PASS hunter2").unwrap();
        assert_eq!(command.to_string(), "PASS ****");
    }

    #[test]
    fn phase_table_matches_the_protocol() {
        assert_eq!(
            Command::Stat.required_state(),
            Some(State::Transaction)
        );
        assert_eq!(
            Command::User(String::new()).required_state(),
            Some(State::Unauthorized)
        );
        assert_eq!(Command::Quit.required_state(), None);
        assert_eq!(Command::Rset.required_state(), None);
    }
}
