mod clock;
mod state;

pub use clock::{Clock, FixedClock, SystemClock};
pub use state::AppState;
