use chrono::{Days, NaiveDate};

use crate::error::{PlantError, PlantResult};

fn interval_days(days_between_watering: i32) -> PlantResult<Days> {
    if days_between_watering <= 0 {
        return Err(PlantError::Validation(format!(
            "Watering interval must be a positive number of days, got {}",
            days_between_watering
        )));
    }
    Ok(Days::new(days_between_watering as u64))
}

/// Date the plant is next due: `last_watered` plus the interval in calendar days.
pub fn compute_next_watering(
    last_watered: NaiveDate,
    days_between_watering: i32,
) -> PlantResult<NaiveDate> {
    let interval = interval_days(days_between_watering)?;
    last_watered
        .checked_add_days(interval)
        .ok_or_else(|| PlantError::Validation("Next watering date is out of range".to_string()))
}

/// A plant is overdue from its due date onwards, inclusive.
pub fn is_overdue(
    last_watered: NaiveDate,
    days_between_watering: i32,
    reference: NaiveDate,
) -> PlantResult<bool> {
    let next_watering = compute_next_watering(last_watered, days_between_watering)?;
    Ok(reference >= next_watering)
}
