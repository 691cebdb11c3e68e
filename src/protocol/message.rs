use super::status;

pub mod action_id {
    pub const LOGIN: i32 = 1;
    pub const BOOK: i32 = 2;
    pub const CONFIRM_BOOKING: i32 = 3;
    pub const CANCEL_BOOKING: i32 = 4;
    pub const LOGOUT: i32 = 5;
    pub const QUERY: i32 = 6;
    pub const TERMINATION: i32 = 7;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Book,
    ConfirmBooking,
    CancelBooking,
    Logout,
    Query,
    Termination,
    // Keeps the raw tag so it can be logged
    Unrecognized(i32),
}

impl From<i32> for Action {
    fn from(value: i32) -> Self {
        match value {
            action_id::LOGIN => Self::Login,
            action_id::BOOK => Self::Book,
            action_id::CONFIRM_BOOKING => Self::ConfirmBooking,
            action_id::CANCEL_BOOKING => Self::CancelBooking,
            action_id::LOGOUT => Self::Logout,
            action_id::QUERY => Self::Query,
            action_id::TERMINATION => Self::Termination,
            other => Self::Unrecognized(other),
        }
    }
}

impl From<Action> for i32 {
    fn from(value: Action) -> Self {
        match value {
            Action::Login => action_id::LOGIN,
            Action::Book => action_id::BOOK,
            Action::ConfirmBooking => action_id::CONFIRM_BOOKING,
            Action::CancelBooking => action_id::CANCEL_BOOKING,
            Action::Logout => action_id::LOGOUT,
            Action::Query => action_id::QUERY,
            Action::Termination => action_id::TERMINATION,
            Action::Unrecognized(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub action: Action,
    pub username: Option<String>,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(action: Action, username: Option<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            action,
            username,
            payload: payload.into(),
        }
    }

    pub fn login(username: &str, password: &str) -> Self {
        Self::new(Action::Login, Some(username.into()), password)
    }

    pub fn logout(username: Option<&str>) -> Self {
        Self::new(Action::Logout, username.map(Into::into), Vec::new())
    }

    pub fn book(username: Option<&str>, seat: &str) -> Self {
        Self::new(Action::Book, username.map(Into::into), seat)
    }

    pub fn cancel_booking(username: Option<&str>, seat: &str) -> Self {
        Self::new(Action::CancelBooking, username.map(Into::into), seat)
    }

    pub fn confirm_booking(username: Option<&str>, mode: &str) -> Self {
        Self::new(Action::ConfirmBooking, username.map(Into::into), mode)
    }

    pub fn query(seat: &str) -> Self {
        Self::new(Action::Query, None, seat)
    }

    pub fn termination() -> Self {
        Self::new(Action::Termination, None, Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: i32,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            status: status::SUCCESS,
            payload,
        }
    }

    pub fn failure(status: i32) -> Self {
        Self {
            status,
            payload: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == status::SUCCESS
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatSnapshot {
    pub id: u32,
    pub owner: Option<String>,
    pub booked: u64,
    pub canceled: u64,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PayloadError {
    #[error("The payload is truncated")]
    Truncated,

    #[error("The payload has {0} trailing bytes")]
    Trailing(usize),

    #[error("The owner name is not valid utf-8")]
    Utf,
}

impl SeatSnapshot {
    // Seat id, booked, canceled, owner length, owner bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let owner = self.owner.as_deref().unwrap_or_default().as_bytes();

        let mut raw = Vec::with_capacity(4 + 8 * 3 + owner.len());
        raw.extend_from_slice(&self.id.to_ne_bytes());
        raw.extend_from_slice(&self.booked.to_ne_bytes());
        raw.extend_from_slice(&self.canceled.to_ne_bytes());
        raw.extend_from_slice(&(owner.len() as u64).to_ne_bytes());
        raw.extend_from_slice(owner);

        raw
    }

    pub fn from_bytes(mut raw: &[u8]) -> Result<Self, PayloadError> {
        let id = u32::from_ne_bytes(take(&mut raw)?);
        let booked = u64::from_ne_bytes(take(&mut raw)?);
        let canceled = u64::from_ne_bytes(take(&mut raw)?);
        let owner_len = u64::from_ne_bytes(take(&mut raw)?) as usize;

        if raw.len() < owner_len {
            return Err(PayloadError::Truncated);
        }
        if raw.len() > owner_len {
            return Err(PayloadError::Trailing(raw.len() - owner_len));
        }

        // An empty owner marks a free seat
        let owner = match owner_len {
            0 => None,
            _ => Some(String::from_utf8(raw.to_vec()).map_err(|_| PayloadError::Utf)?),
        };

        Ok(Self {
            id,
            owner,
            booked,
            canceled,
        })
    }
}

pub fn encode_seat_ids(ids: &[u32]) -> Vec<u8> {
    ids.iter().flat_map(|id| id.to_ne_bytes()).collect()
}

pub fn decode_seat_ids(raw: &[u8]) -> Result<Vec<u32>, PayloadError> {
    let chunks = raw.chunks_exact(4);
    if !chunks.remainder().is_empty() {
        return Err(PayloadError::Trailing(chunks.remainder().len()));
    }

    Ok(chunks
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn take<const N: usize>(raw: &mut &[u8]) -> Result<[u8; N], PayloadError> {
    if raw.len() < N {
        return Err(PayloadError::Truncated);
    }

    let (head, tail) = raw.split_at(N);
    *raw = tail;

    let mut field = [0u8; N];
    field.copy_from_slice(head);
    Ok(field)
}
