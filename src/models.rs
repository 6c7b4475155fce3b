use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlantResult;
use crate::schedule::compute_next_watering;

/// Stored plant record. `next_watering` is not part of it; see [`PlantView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub days_between_watering: i32,
    pub last_watered: NaiveDate,
}

impl Plant {
    pub fn new(owner_id: String, name: String, days_between_watering: i32, last_watered: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            name,
            days_between_watering,
            last_watered,
        }
    }

    pub fn next_watering(&self) -> PlantResult<NaiveDate> {
        compute_next_watering(self.last_watered, self.days_between_watering)
    }
}

/// A plant as returned to callers, with the next watering date derived at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantView {
    pub id: String,
    pub name: String,
    pub days_between_watering: i32,
    pub last_watered: NaiveDate,
    pub next_watering: NaiveDate,
}

impl PlantView {
    pub fn from_plant(plant: &Plant) -> PlantResult<Self> {
        Ok(Self {
            id: plant.id.clone(),
            name: plant.name.clone(),
            days_between_watering: plant.days_between_watering,
            last_watered: plant.last_watered,
            next_watering: plant.next_watering()?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePlantRequest {
    pub name: String,
    pub days_between_watering: i32,
    /// Defaults to today when omitted.
    pub last_watered: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlantListResponse {
    pub plants: Vec<PlantView>,
}
