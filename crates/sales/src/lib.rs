//! Sales domain: bookings and the append-only payment log.

pub mod booking;
pub mod payment;

pub use booking::{Booking, NewBooking, PaymentStatus};
pub use payment::{NewPayment, PaymentRecord};
