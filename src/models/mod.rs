pub mod attendance;
pub mod booking;
pub mod event;
pub mod payment;
pub mod transaction_log;

pub use attendance::{Attendance, AttendanceEventStats, NewAttendance};
pub use booking::{Booking, BookingError, BookingListFilter, BookingMember, CreateBookingRequest};
pub use event::{EventTier, FusionXEvent};
pub use payment::Payment;
pub use transaction_log::{LogEntry, TransactionLog};
