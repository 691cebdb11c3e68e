pub mod password;
pub mod seats;
pub mod users;
