use crate::{
    protocol::{
        message::{encode_seat_ids, Action, Request, Response},
        status::{
            self, into_response, BookError, CancelBookingError, ConfirmBookingError, LoginError,
            LogoutError, QueryError,
        },
    },
    systems::{
        password::PasswordHasher,
        seats::{BookOutcome, CancelOutcome, SeatTable},
        users::UserDirectory,
    },
};

const LIST_AVAILABLE: &[u8] = b"available";
const LIST_BOOKED: &[u8] = b"booked";

// Every request takes at most one seat lock or one directory operation, never both at once
pub struct Processor {
    seats: SeatTable,
    users: UserDirectory,
    hasher: Box<dyn PasswordHasher>,
}

impl Processor {
    pub fn new(num_seats: u32, hasher: Box<dyn PasswordHasher>) -> Self {
        Self {
            seats: SeatTable::new(num_seats),
            users: UserDirectory::default(),
            hasher,
        }
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn handle(&self, request: &Request) -> Response {
        let username = request.username.as_deref();
        let payload = request.payload.as_slice();

        match request.action {
            Action::Login => into_response(self.login(username, payload)),
            Action::Book => into_response(self.book(username, payload)),
            Action::ConfirmBooking => into_response(self.confirm_booking(username, payload)),
            Action::CancelBooking => into_response(self.cancel_booking(username, payload)),
            Action::Logout => into_response(self.logout(username)),
            Action::Query => into_response(self.query(payload)),
            Action::Termination => Response::failure(status::FAILURE),
            Action::Unrecognized(tag) => {
                tracing::debug!("received an unrecognized action: {}", tag);
                Response::failure(status::FAILURE)
            }
        }
    }

    // The user that owns the request, if it's currently logged in
    fn active_user<'a>(&self, username: Option<&'a str>) -> Option<&'a str> {
        username.filter(|username| self.users.is_logged_in(username))
    }

    fn login(&self, username: Option<&str>, password: &[u8]) -> Result<Vec<u8>, LoginError> {
        if password.is_empty() {
            return Err(LoginError::NoPassword);
        }
        let username = username.ok_or(LoginError::NoUsername)?;

        self.users.login(username, password, &*self.hasher)?;
        Ok(Vec::new())
    }

    fn book(&self, username: Option<&str>, payload: &[u8]) -> Result<Vec<u8>, BookError> {
        if payload.is_empty() {
            return Err(BookError::NoData);
        }
        let username = self
            .active_user(username)
            .ok_or(BookError::UserNotLoggedIn)?;
        let id = self
            .seats
            .parse_id(payload)
            .ok_or(BookError::SeatOutOfRange)?;

        match self.seats.book(id, username) {
            BookOutcome::Booked => Ok(Vec::new()),
            BookOutcome::Unavailable => Err(BookError::SeatUnavailable),
        }
    }

    fn cancel_booking(
        &self,
        username: Option<&str>,
        payload: &[u8],
    ) -> Result<Vec<u8>, CancelBookingError> {
        if payload.is_empty() {
            return Err(CancelBookingError::NoData);
        }
        let username = self
            .active_user(username)
            .ok_or(CancelBookingError::UserNotLoggedIn)?;
        let id = self
            .seats
            .parse_id(payload)
            .ok_or(CancelBookingError::SeatOutOfRange)?;

        match self.seats.cancel(id, username) {
            CancelOutcome::Canceled => Ok(Vec::new()),
            CancelOutcome::NotBookedByUser => Err(CancelBookingError::SeatNotBookedByUser),
        }
    }

    fn confirm_booking(
        &self,
        username: Option<&str>,
        payload: &[u8],
    ) -> Result<Vec<u8>, ConfirmBookingError> {
        if payload.is_empty() {
            return Err(ConfirmBookingError::NoData);
        }
        let username = self
            .active_user(username)
            .ok_or(ConfirmBookingError::UserNotLoggedIn)?;

        let ids = match payload {
            LIST_AVAILABLE => self.seats.available(),
            LIST_BOOKED => self.seats.booked_by(username),
            _ => return Err(ConfirmBookingError::InvalidData),
        };

        Ok(encode_seat_ids(&ids))
    }

    fn query(&self, payload: &[u8]) -> Result<Vec<u8>, QueryError> {
        if payload.is_empty() {
            return Err(QueryError::NoData);
        }
        let id = self
            .seats
            .parse_id(payload)
            .ok_or(QueryError::SeatOutOfRange)?;

        Ok(self.seats.snapshot(id).to_bytes())
    }

    fn logout(&self, username: Option<&str>) -> Result<Vec<u8>, LogoutError> {
        let username = username.ok_or(LogoutError::UserNotFound)?;

        self.users.logout(username)?;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::Processor;
    use crate::{
        protocol::{
            message::{decode_seat_ids, Action, Request, Response, SeatSnapshot},
            status::{
                self, ActionError, BookError, CancelBookingError, ConfirmBookingError, LoginError,
                LogoutError, QueryError,
            },
        },
        systems::password::HmacSha256,
    };

    fn processor(num_seats: u32) -> Processor {
        Processor::new(num_seats, Box::new(HmacSha256::new(b"test").unwrap()))
    }

    fn assert_error<E: ActionError + std::fmt::Debug>(response: Response, expected: E) {
        assert_eq!(response.status, expected.code(), "expected {expected:?}");
        assert!(response.payload.is_empty());
    }

    fn seat_ids(response: Response) -> Vec<u32> {
        assert!(response.is_success(), "status {}", response.status);
        decode_seat_ids(&response.payload).unwrap()
    }

    fn snapshot(processor: &Processor, seat: &str) -> SeatSnapshot {
        let response = processor.handle(&Request::query(seat));
        assert!(response.is_success());
        SeatSnapshot::from_bytes(&response.payload).unwrap()
    }

    #[test]
    fn reservation_scenario() {
        let p = processor(5);

        assert!(p.handle(&Request::login("alice", "pw1")).is_success());
        assert!(p.handle(&Request::login("bob", "pw2")).is_success());
        assert!(p.handle(&Request::book(Some("alice"), "3")).is_success());
        assert_error(
            p.handle(&Request::book(Some("bob"), "3")),
            BookError::SeatUnavailable,
        );
        assert_eq!(
            seat_ids(p.handle(&Request::confirm_booking(Some("alice"), "booked"))),
            vec![3]
        );
        assert_eq!(
            seat_ids(p.handle(&Request::confirm_booking(Some("bob"), "available"))),
            vec![1, 2, 4, 5]
        );
        assert!(p
            .handle(&Request::cancel_booking(Some("alice"), "3"))
            .is_success());
        assert!(p.handle(&Request::book(Some("bob"), "3")).is_success());
        assert!(p.handle(&Request::logout(Some("alice"))).is_success());
        assert_error(
            p.handle(&Request::login("alice", "wrongpw")),
            LoginError::IncorrectPassword,
        );

        let seat = snapshot(&p, "3");
        assert_eq!(seat.owner.as_deref(), Some("bob"));
        assert_eq!((seat.booked, seat.canceled), (2, 1));
    }

    #[test]
    fn login_errors() {
        let p = processor(5);

        assert_error(p.handle(&Request::login("alice", "")), LoginError::NoPassword);
        assert_error(
            p.handle(&Request::new(Action::Login, None, "pw")),
            LoginError::NoUsername,
        );
        // A refused login never creates the user
        assert!(p.users().is_empty());

        assert!(p.handle(&Request::login("alice", "pw")).is_success());
        assert_error(p.handle(&Request::login("alice", "pw")), LoginError::ActiveUser);
    }

    #[test]
    fn logout_errors_are_distinct() {
        let p = processor(5);

        assert_error(
            p.handle(&Request::logout(Some("ghost"))),
            LogoutError::UserNotFound,
        );
        assert_error(p.handle(&Request::logout(None)), LogoutError::UserNotFound);

        p.handle(&Request::login("alice", "pw"));
        assert!(p.handle(&Request::logout(Some("alice"))).is_success());
        assert_error(
            p.handle(&Request::logout(Some("alice"))),
            LogoutError::UserNotLoggedIn,
        );
        assert!(p.users().len() == 1);
    }

    #[test]
    fn booking_requires_a_session() {
        let p = processor(5);

        assert_error(
            p.handle(&Request::book(Some("alice"), "1")),
            BookError::UserNotLoggedIn,
        );
        assert_error(p.handle(&Request::book(None, "1")), BookError::UserNotLoggedIn);
        assert_error(
            p.handle(&Request::cancel_booking(Some("alice"), "1")),
            CancelBookingError::UserNotLoggedIn,
        );
        assert_error(
            p.handle(&Request::confirm_booking(None, "available")),
            ConfirmBookingError::UserNotLoggedIn,
        );

        // A logged out user loses access as well
        p.handle(&Request::login("alice", "pw"));
        p.handle(&Request::logout(Some("alice")));
        assert_error(
            p.handle(&Request::book(Some("alice"), "1")),
            BookError::UserNotLoggedIn,
        );

        assert_eq!(snapshot(&p, "1").booked, 0);
    }

    #[test]
    fn malformed_seat_ids_are_out_of_range() {
        let p = processor(5);
        p.handle(&Request::login("alice", "pw"));
        p.handle(&Request::book(Some("alice"), "3"));

        for seat in ["3x", "0", "999", "6", "-1", "three", "3 "] {
            assert_error(
                p.handle(&Request::book(Some("alice"), seat)),
                BookError::SeatOutOfRange,
            );
            assert_error(
                p.handle(&Request::cancel_booking(Some("alice"), seat)),
                CancelBookingError::SeatOutOfRange,
            );
            assert_error(p.handle(&Request::query(seat)), QueryError::SeatOutOfRange);
        }

        // Nothing moved
        let seat = snapshot(&p, "3");
        assert_eq!(seat.owner.as_deref(), Some("alice"));
        assert_eq!((seat.booked, seat.canceled), (1, 0));
    }

    #[test]
    fn empty_payloads() {
        let p = processor(5);
        p.handle(&Request::login("alice", "pw"));

        assert_error(p.handle(&Request::book(Some("alice"), "")), BookError::NoData);
        assert_error(
            p.handle(&Request::cancel_booking(Some("alice"), "")),
            CancelBookingError::NoData,
        );
        assert_error(
            p.handle(&Request::confirm_booking(Some("alice"), "")),
            ConfirmBookingError::NoData,
        );
        assert_error(p.handle(&Request::query("")), QueryError::NoData);
    }

    #[test]
    fn confirm_booking_modes() {
        let p = processor(3);
        p.handle(&Request::login("alice", "pw"));

        assert_error(
            p.handle(&Request::confirm_booking(Some("alice"), "everything")),
            ConfirmBookingError::InvalidData,
        );
        assert_error(
            p.handle(&Request::confirm_booking(Some("alice"), "Available")),
            ConfirmBookingError::InvalidData,
        );

        // No bookings is an empty payload, not an error
        let response = p.handle(&Request::confirm_booking(Some("alice"), "booked"));
        assert!(response.is_success());
        assert!(response.payload.is_empty());
    }

    #[test]
    fn cancel_by_someone_else() {
        let p = processor(5);
        p.handle(&Request::login("alice", "pw"));
        p.handle(&Request::login("bob", "pw"));
        p.handle(&Request::book(Some("alice"), "2"));

        assert_error(
            p.handle(&Request::cancel_booking(Some("bob"), "2")),
            CancelBookingError::SeatNotBookedByUser,
        );
        assert_error(
            p.handle(&Request::cancel_booking(Some("bob"), "4")),
            CancelBookingError::SeatNotBookedByUser,
        );

        let seat = snapshot(&p, "2");
        assert_eq!(seat.owner.as_deref(), Some("alice"));
        assert_eq!(seat.canceled, 0);

        // Once canceled anyone can take it
        assert!(p
            .handle(&Request::cancel_booking(Some("alice"), "2"))
            .is_success());
        assert!(p.handle(&Request::book(Some("bob"), "2")).is_success());
        assert_eq!(snapshot(&p, "2").canceled, 1);
    }

    #[test]
    fn listings_partition_the_table() {
        let p = processor(10);
        let users = ["alice", "bob", "carol"];
        for user in users {
            p.handle(&Request::login(user, "pw"));
        }

        for (seat, user) in [(1, "alice"), (4, "bob"), (5, "alice"), (9, "carol")] {
            assert!(p
                .handle(&Request::book(Some(user), &seat.to_string()))
                .is_success());
        }

        let mut all = seat_ids(p.handle(&Request::confirm_booking(Some("bob"), "available")));
        for user in users {
            all.extend(seat_ids(
                p.handle(&Request::confirm_booking(Some(user), "booked")),
            ));
        }
        all.sort_unstable();

        assert_eq!(all, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn termination_and_unknown_actions() {
        let p = processor(5);

        let response = p.handle(&Request::termination());
        assert_eq!(response, Response::failure(status::FAILURE));

        let response = p.handle(&Request::new(Action::Unrecognized(77), None, "1"));
        assert_eq!(response, Response::failure(status::FAILURE));
    }

    #[test]
    fn concurrent_booking_of_one_seat() {
        for _ in 0..50 {
            let p = Arc::new(processor(5));
            p.handle(&Request::login("alice", "pw"));
            p.handle(&Request::login("bob", "pw"));

            let racers: Vec<_> = ["alice", "bob"]
                .into_iter()
                .map(|user| {
                    let p = p.clone();
                    thread::spawn(move || p.handle(&Request::book(Some(user), "4")))
                })
                .collect();

            let mut statuses: Vec<_> = racers
                .into_iter()
                .map(|racer| racer.join().unwrap().status)
                .collect();
            statuses.sort_unstable();

            assert_eq!(
                statuses,
                vec![status::SUCCESS, BookError::SeatUnavailable.code()]
            );
            assert_eq!(snapshot(&p, "4").booked, 1);
        }
    }
}
