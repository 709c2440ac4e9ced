use core::fmt::{self, Display, Formatter};

const EOL: &str = "\r\n";
const TERMINATOR: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Err,
}

impl Display for Status {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        fmt.write_str(match self {
            Self::Ok => "+OK",
            Self::Err => "-ERR",
        })
    }
}

/// One complete server response: a status line, optionally followed by a
/// multi-line body and the terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    message: String,
    lines: Option<Vec<String>>,
}

impl Response {
    #[must_use]
    pub fn ok<M: Into<String>>(message: M) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            lines: None,
        }
    }

    #[must_use]
    pub fn err<M: Into<String>>(message: M) -> Self {
        Self {
            status: Status::Err,
            message: message.into(),
            lines: None,
        }
    }

    #[must_use]
    pub fn ok_multiline<M: Into<String>>(message: M, lines: Vec<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            lines: Some(lines),
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Serialize to wire form.
    ///
    /// Multi-line bodies end with a lone `.` line; any content line that
    /// is itself exactly `.` gets an extra empty line stuffed in front of
    /// it so clients can tell it apart from the terminator. Clients undo
    /// the stuffing, so the rule must be reproduced exactly.
    #[must_use]
    pub fn render(&self) -> String {
        let mut wire = if self.message.is_empty() {
            format!("{}{EOL}", self.status)
        } else {
            format!("{} {}{EOL}", self.status, self.message)
        };

        if let Some(lines) = &self.lines {
            for line in lines {
                if line == TERMINATOR {
                    wire.push_str(EOL);
                }
                wire.push_str(line);
                wire.push_str(EOL);
            }
            wire.push_str(TERMINATOR);
            wire.push_str(EOL);
        }

        wire
    }
}
