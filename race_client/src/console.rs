//! Console command parsing for the `race-client` binary.
//!
//! # Commands
//! ```text
//! create            create a room and join it
//! ai                create a room against AI and join it
//! room <uid>        set the room to join
//! join              join the selected room
//! ready             mark ready in the lobby
//! leave             leave the lobby
//! left | right      change lane
//! menu              back to the menu from the results
//! car <uid>         select a car
//! address <addr>    set the wallet address (player id)
//! status            print client status
//! reconnect         restart the realtime connection
//! quit              exit
//! ```

use crate::{input::Key, scene::UiAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Action(UiAction),
    Status,
    Reconnect,
    Help,
    Quit,
}

pub const HELP: &str = "Commands: create, ai, room <uid>, join, ready, leave, left, right, \
                        menu, car <uid>, address <addr>, status, reconnect, quit";

/// Parses one console line. `Err` carries a usage message.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let arg = |usage: &str| {
        args.first()
            .map(|s| s.to_string())
            .ok_or_else(|| format!("Usage: {usage}"))
    };

    let cmd = match head.to_ascii_lowercase().as_str() {
        "create" => Command::Action(UiAction::CreateRoom),
        "ai" => Command::Action(UiAction::CreateVsAi),
        "room" => Command::Action(UiAction::SetRoomUid(arg("room <uid>")?)),
        "join" => Command::Action(UiAction::JoinRoom),
        "ready" => Command::Action(UiAction::MarkReady),
        "leave" => Command::Action(UiAction::LeaveRoom),
        "left" => Command::Action(UiAction::Steer(Key::Left)),
        "right" => Command::Action(UiAction::Steer(Key::Right)),
        "menu" | "back" => Command::Action(UiAction::BackToMenu),
        "car" => Command::Action(UiAction::SetCarUid(arg("car <uid>")?)),
        "address" => Command::Action(UiAction::SetPlayerAddress(arg("address <addr>")?)),
        "status" => Command::Status,
        "reconnect" => Command::Reconnect,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(Some(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse("room  r-42 ").unwrap(),
            Some(Command::Action(UiAction::SetRoomUid("r-42".into())))
        );
        assert_eq!(
            parse("LEFT").unwrap(),
            Some(Command::Action(UiAction::Steer(Key::Left)))
        );
        assert_eq!(parse("quit").unwrap(), Some(Command::Quit));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn missing_argument_or_unknown_command() {
        assert_eq!(parse("car").unwrap_err(), "Usage: car <uid>");
        assert_eq!(parse("fly").unwrap_err(), "Unknown command: fly");
    }
}
