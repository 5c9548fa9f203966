//! User actions read from stdin.

use std::str::FromStr;

use board_sync::SortState;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Click a header: `sort <column> asc|desc`.
    Sort(SortState),
    /// Auto-reload checkbox: `auto on|off`.
    AutoReload(bool),
    /// Manual reload button.
    Reload,
    /// Cache an identity as the login page would: `login <id> <key> <name>`.
    Login {
        user_id: String,
        user_key: String,
        user_name: String,
    },
    /// Forget the cached identity.
    Logout,
    /// Print the page state.
    Status,
    /// Close the page.
    Quit,
}

/// Help text listing every command.
pub const USAGE: &str = "commands: sort <column> asc|desc, auto on|off, reload, \
                         login <id> <key> <name>, logout, status, quit";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["sort", column, direction] => {
                let column = column
                    .parse()
                    .map_err(|_| format!("not a column index: {}", column))?;
                match *direction {
                    "asc" => Ok(Self::Sort(SortState::asc(column))),
                    "desc" => Ok(Self::Sort(SortState::desc(column))),
                    other => Err(format!("expected asc or desc, got {}", other)),
                }
            }
            ["auto", "on"] => Ok(Self::AutoReload(true)),
            ["auto", "off"] => Ok(Self::AutoReload(false)),
            ["reload"] => Ok(Self::Reload),
            ["login", user_id, user_key, name @ ..] if !name.is_empty() => Ok(Self::Login {
                user_id: user_id.to_string(),
                user_key: user_key.to_string(),
                user_name: name.join(" "),
            }),
            ["logout"] => Ok(Self::Logout),
            ["status"] => Ok(Self::Status),
            ["quit"] | ["exit"] => Ok(Self::Quit),
            _ => Err(USAGE.to_string()),
        }
    }
}
