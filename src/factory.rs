// 🏭 Reading Factory - accepted candidate → MeterReading
//
// Trusts the rule evaluator: the value text is already known to be five
// ASCII digits, so it always fits in a u32.

use crate::models::MeterReading;
use crate::rules::AcceptedCandidate;

/// Build the reading to persist for an accepted candidate
pub fn build_reading(accepted: &AcceptedCandidate) -> MeterReading {
    let value = accepted
        .meter_read_value
        .bytes()
        .fold(0u32, |acc, digit| acc * 10 + u32::from(digit - b'0'));

    MeterReading::new(accepted.account_id, accepted.reading_date_time, value)
}
