use std::str::FromStr;

use tokio::{
    io::{AsyncWriteExt, BufWriter},
    net::{TcpStream, ToSocketAddrs},
};

use crate::protocol::{
    deserializer::{Deserialize, DeserializeError},
    message::{decode_seat_ids, PayloadError, Request, Response, SeatSnapshot},
    serializer::{Serialize, SerializeError},
    status::{
        ActionError, BookError, CancelBookingError, ConfirmBookingError, LoginError, LogoutError,
        QueryError,
    },
};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Serialize(#[from] SerializeError),

    #[error("{0}")]
    Deserialize(#[from] DeserializeError),

    #[error("{0}")]
    Io(#[from] tokio::io::Error),

    #[error("The server sent a malformed payload: {0}")]
    Payload(#[from] PayloadError),
}

// There is no reconnect logic, any I/O failure ends the session
pub struct Client {
    stream: TcpStream,
    active_user: Option<String>,
}

impl Client {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            active_user: None,
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> tokio::io::Result<Self> {
        Ok(Self::new(TcpStream::connect(addr).await?))
    }

    pub fn active_user(&self) -> Option<&str> {
        self.active_user.as_deref()
    }

    pub async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        let mut writer = BufWriter::new(&mut self.stream);
        request.serialize(&mut writer).await?;
        writer.flush().await?;

        Ok(Response::deserialize(&mut self.stream).await?)
    }

    pub async fn execute(&mut self, command: Command) -> Result<String, ClientError> {
        if let (Command::Login { .. }, Some(user)) = (&command, &self.active_user) {
            return Ok(format!("Already logged in as {user}, log out first"));
        }

        let request = command.to_request(self.active_user.as_deref());
        let response = self.send(&request).await?;

        let reply = match &command {
            Command::Login { username, .. } => {
                describe::<LoginError>(&response, || {
                    self.active_user = Some(username.clone());
                    Ok(format!("Logged in as {username}"))
                })?
            }
            Command::Logout => describe::<LogoutError>(&response, || {
                let user = self.active_user.take().unwrap_or_default();
                Ok(format!("Logged out {user}"))
            })?,
            Command::Book { seat } => {
                describe::<BookError>(&response, || Ok(format!("Booked seat {seat}")))?
            }
            Command::Cancel { seat } => {
                describe::<CancelBookingError>(&response, || Ok(format!("Canceled seat {seat}")))?
            }
            Command::Confirm { listing } => describe::<ConfirmBookingError>(&response, || {
                let ids = decode_seat_ids(&response.payload)?;
                Ok(format_listing(listing, &ids))
            })?,
            Command::Query { .. } => describe::<QueryError>(&response, || {
                let snapshot = SeatSnapshot::from_bytes(&response.payload)?;
                Ok(format_snapshot(&snapshot))
            })?,
        };

        Ok(reply)
    }

    pub async fn terminate(mut self) -> Result<Option<String>, ClientError> {
        match self.active_user.is_some() {
            true => Ok(Some(self.execute(Command::Logout).await?)),
            false => Ok(None),
        }
    }
}

// Turns a response into a message, `on_success` only runs for a zero status
fn describe<E: ActionError>(
    response: &Response,
    on_success: impl FnOnce() -> Result<String, ClientError>,
) -> Result<String, ClientError> {
    if response.is_success() {
        return on_success();
    }

    Ok(match E::from_code(response.status) {
        Some(reason) => format!("Error: {reason}"),
        None => format!("Error: unexpected status {}", response.status),
    })
}

fn format_listing(listing: &str, ids: &[u32]) -> String {
    if ids.is_empty() {
        return format!("No {listing} seats");
    }

    let ids = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("Seats {listing}: {ids}")
}

fn format_snapshot(snapshot: &SeatSnapshot) -> String {
    let state = match &snapshot.owner {
        Some(owner) => format!("booked by {owner}"),
        None => "available".to_string(),
    };

    format!(
        "Seat {}: {} (booked {} times, canceled {} times)",
        snapshot.id, state, snapshot.booked, snapshot.canceled
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Book { seat: String },
    Cancel { seat: String },
    Confirm { listing: String },
    Query { seat: String },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CommandParseErr {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandParseErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let name = words.next().ok_or(CommandParseErr::Empty)?;
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("login", [username, password]) => Self::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            ("login", _) => return Err(CommandParseErr::Usage("login <username> <password>")),
            ("logout", []) => Self::Logout,
            ("logout", _) => return Err(CommandParseErr::Usage("logout")),
            ("book", [seat]) => Self::Book {
                seat: seat.to_string(),
            },
            ("book", _) => return Err(CommandParseErr::Usage("book <seat>")),
            ("cancel", [seat]) => Self::Cancel {
                seat: seat.to_string(),
            },
            ("cancel", _) => return Err(CommandParseErr::Usage("cancel <seat>")),
            ("confirm", [listing]) => Self::Confirm {
                listing: listing.to_string(),
            },
            ("confirm", _) => return Err(CommandParseErr::Usage("confirm <available|booked>")),
            ("query", [seat]) => Self::Query {
                seat: seat.to_string(),
            },
            ("query", _) => return Err(CommandParseErr::Usage("query <seat>")),
            (other, _) => return Err(CommandParseErr::Unknown(other.to_string())),
        };

        Ok(command)
    }
}

impl Command {
    pub fn to_request(&self, active_user: Option<&str>) -> Request {
        match self {
            Self::Login { username, password } => Request::login(username, password),
            Self::Logout => Request::logout(active_user),
            Self::Book { seat } => Request::book(active_user, seat),
            Self::Cancel { seat } => Request::cancel_booking(active_user, seat),
            Self::Confirm { listing } => Request::confirm_booking(active_user, listing),
            Self::Query { seat } => Request::query(seat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{format_listing, format_snapshot, Command, CommandParseErr};
    use crate::protocol::message::{Action, SeatSnapshot};

    #[test]
    fn parse_commands() {
        let commands = [
            "login alice pw1",
            "  book   3 ",
            "cancel 3",
            "confirm available",
            "query 17",
            "logout",
        ];

        let expected = [
            Command::Login {
                username: "alice".into(),
                password: "pw1".into(),
            },
            Command::Book { seat: "3".into() },
            Command::Cancel { seat: "3".into() },
            Command::Confirm {
                listing: "available".into(),
            },
            Command::Query { seat: "17".into() },
            Command::Logout,
        ];

        for (raw, expected) in commands.iter().zip(expected) {
            assert_eq!(raw.parse::<Command>().unwrap(), expected);
        }
    }

    #[test]
    fn reject_bad_commands() {
        assert_eq!("".parse::<Command>(), Err(CommandParseErr::Empty));
        assert_eq!(
            "dance".parse::<Command>(),
            Err(CommandParseErr::Unknown("dance".into()))
        );
        assert!(matches!(
            "login alice".parse::<Command>(),
            Err(CommandParseErr::Usage(_))
        ));
        assert!(matches!(
            "book 1 2".parse::<Command>(),
            Err(CommandParseErr::Usage(_))
        ));
    }

    #[test]
    fn commands_use_the_active_user() {
        let request = Command::Book { seat: "4".into() }.to_request(Some("bob"));
        assert_eq!(request.action, Action::Book);
        assert_eq!(request.username.as_deref(), Some("bob"));
        assert_eq!(request.payload, b"4");

        // Queries never carry a username
        let request = Command::Query { seat: "4".into() }.to_request(Some("bob"));
        assert_eq!(request.username, None);

        let request = Command::Logout.to_request(None);
        assert_eq!(request.username, None);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_listing("booked", &[]), "No booked seats");
        assert_eq!(
            format_listing("available", &[1, 2, 4]),
            "Seats available: 1, 2, 4"
        );

        let snapshot = SeatSnapshot {
            id: 3,
            owner: Some("bob".into()),
            booked: 2,
            canceled: 1,
        };
        assert_eq!(
            format_snapshot(&snapshot),
            "Seat 3: booked by bob (booked 2 times, canceled 1 times)"
        );
    }
}
