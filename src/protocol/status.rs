use super::message::Response;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = -1;

pub trait ActionError: Sized + Copy + std::fmt::Display {
    fn code(self) -> i32;

    fn from_code(code: i32) -> Option<Self>;
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    #[error("A password is required to log in")]
    NoPassword,

    #[error("The user is already logged in")]
    ActiveUser,

    #[error("The password is incorrect")]
    IncorrectPassword,

    #[error("A username is required to log in")]
    NoUsername,
}

impl ActionError for LoginError {
    fn code(self) -> i32 {
        match self {
            Self::NoPassword => 1,
            Self::ActiveUser => 2,
            Self::IncorrectPassword => 3,
            Self::NoUsername => 4,
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::NoPassword),
            2 => Some(Self::ActiveUser),
            3 => Some(Self::IncorrectPassword),
            4 => Some(Self::NoUsername),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookError {
    #[error("No seat was given")]
    NoData,

    #[error("The user is not logged in")]
    UserNotLoggedIn,

    #[error("The seat number is out of range")]
    SeatOutOfRange,

    #[error("The seat is already booked")]
    SeatUnavailable,
}

impl ActionError for BookError {
    fn code(self) -> i32 {
        match self {
            Self::NoData => 1,
            Self::UserNotLoggedIn => 2,
            Self::SeatOutOfRange => 3,
            Self::SeatUnavailable => 4,
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::NoData),
            2 => Some(Self::UserNotLoggedIn),
            3 => Some(Self::SeatOutOfRange),
            4 => Some(Self::SeatUnavailable),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelBookingError {
    #[error("No seat was given")]
    NoData,

    #[error("The user is not logged in")]
    UserNotLoggedIn,

    #[error("The seat number is out of range")]
    SeatOutOfRange,

    #[error("The seat is not booked by this user")]
    SeatNotBookedByUser,
}

impl ActionError for CancelBookingError {
    fn code(self) -> i32 {
        match self {
            Self::NoData => 1,
            Self::UserNotLoggedIn => 2,
            Self::SeatOutOfRange => 3,
            Self::SeatNotBookedByUser => 4,
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::NoData),
            2 => Some(Self::UserNotLoggedIn),
            3 => Some(Self::SeatOutOfRange),
            4 => Some(Self::SeatNotBookedByUser),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmBookingError {
    #[error("Expected either \"available\" or \"booked\"")]
    NoData,

    #[error("The user is not logged in")]
    UserNotLoggedIn,

    #[error("Unknown listing, expected either \"available\" or \"booked\"")]
    InvalidData,
}

impl ActionError for ConfirmBookingError {
    fn code(self) -> i32 {
        match self {
            Self::NoData => 1,
            Self::UserNotLoggedIn => 2,
            Self::InvalidData => 3,
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::NoData),
            2 => Some(Self::UserNotLoggedIn),
            3 => Some(Self::InvalidData),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    #[error("No seat was given")]
    NoData,

    #[error("The seat number is out of range")]
    SeatOutOfRange,
}

impl ActionError for QueryError {
    fn code(self) -> i32 {
        match self {
            Self::NoData => 1,
            Self::SeatOutOfRange => 2,
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::NoData),
            2 => Some(Self::SeatOutOfRange),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutError {
    #[error("The user does not exist")]
    UserNotFound,

    #[error("The user is not logged in")]
    UserNotLoggedIn,
}

impl ActionError for LogoutError {
    fn code(self) -> i32 {
        match self {
            Self::UserNotFound => 1,
            Self::UserNotLoggedIn => 2,
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::UserNotFound),
            2 => Some(Self::UserNotLoggedIn),
            _ => None,
        }
    }
}

pub fn into_response<E: ActionError>(outcome: Result<Vec<u8>, E>) -> Response {
    match outcome {
        Ok(payload) => Response::success(payload),
        Err(reason) => Response::failure(reason.code()),
    }
}
