use parking_lot::Mutex;

use crate::protocol::message::SeatSnapshot;

pub type SeatId = u32;

#[derive(Debug, Default)]
struct Seat {
    owner: Option<String>,
    booked: u64,
    canceled: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOutcome {
    Booked,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Canceled,
    NotBookedByUser,
}

// No method ever holds more than one seat lock at a time
#[derive(Debug)]
pub struct SeatTable {
    seats: Box<[Mutex<Seat>]>,
}

impl SeatTable {
    pub fn new(count: u32) -> Self {
        Self {
            seats: (0..count).map(|_| Mutex::default()).collect(),
        }
    }

    pub fn len(&self) -> u32 {
        self.seats.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// The whole payload must be a base-10 number inside the table
    pub fn parse_id(&self, payload: &[u8]) -> Option<SeatId> {
        let id = std::str::from_utf8(payload).ok()?.parse::<SeatId>().ok()?;
        (1..=self.len()).contains(&id).then_some(id)
    }

    // `id` must come from `parse_id`
    fn seat(&self, id: SeatId) -> &Mutex<Seat> {
        &self.seats[(id - 1) as usize]
    }

    pub fn book(&self, id: SeatId, username: &str) -> BookOutcome {
        let mut seat = self.seat(id).lock();
        if seat.owner.is_some() {
            return BookOutcome::Unavailable;
        }

        seat.owner = Some(username.to_owned());
        seat.booked += 1;
        BookOutcome::Booked
    }

    pub fn cancel(&self, id: SeatId, username: &str) -> CancelOutcome {
        let mut seat = self.seat(id).lock();
        if seat.owner.as_deref() != Some(username) {
            return CancelOutcome::NotBookedByUser;
        }

        seat.owner = None;
        seat.canceled += 1;
        CancelOutcome::Canceled
    }

    pub fn snapshot(&self, id: SeatId) -> SeatSnapshot {
        let seat = self.seat(id).lock();

        SeatSnapshot {
            id,
            owner: seat.owner.clone(),
            booked: seat.booked,
            canceled: seat.canceled,
        }
    }

    pub fn available(&self) -> Vec<SeatId> {
        self.collect_ids(|seat| seat.owner.is_none())
    }

    pub fn booked_by(&self, username: &str) -> Vec<SeatId> {
        self.collect_ids(|seat| seat.owner.as_deref() == Some(username))
    }

    // Each seat is locked on its own, the scan is not an atomic view of the table
    fn collect_ids(&self, keep: impl Fn(&Seat) -> bool) -> Vec<SeatId> {
        self.seats
            .iter()
            .zip(1..)
            .filter(|(seat, _)| keep(&seat.lock()))
            .map(|(_, id)| id)
            .collect()
    }
}
