use chrono::{DateTime, SubsecRound, Utc};

/// The current time, truncated to microseconds.
///
/// Postgres only stores timestamps to microsecond precision. Stamping records with this value means an order read back
/// from either backend compares equal to the one returned when it was inserted.
pub fn db_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
