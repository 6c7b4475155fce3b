use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::{PlantError, PlantResult};
use crate::models::{Plant, PlantView};
use crate::schedule::compute_next_watering;
use crate::storage::RecordStore;

const MAX_NAME_LEN: usize = 100;

/// Create, water, delete and list plants on behalf of one owner at a time.
#[derive(Clone)]
pub struct PlantService {
    store: Arc<dyn RecordStore>,
}

impl PlantService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create_plant(
        &self,
        owner_id: &str,
        name: &str,
        days_between_watering: i32,
        last_watered: NaiveDate,
    ) -> PlantResult<PlantView> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlantError::Validation("Plant name cannot be empty".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(PlantError::Validation(format!(
                "Plant name cannot be longer than {} characters",
                MAX_NAME_LEN
            )));
        }
        // Validates the interval before anything is written.
        compute_next_watering(last_watered, days_between_watering)?;

        let plant = Plant::new(owner_id.to_string(), name.to_string(), days_between_watering, last_watered);
        let plant = self.store.insert_plant(plant).await?;
        tracing::info!(owner_id, plant_id = %plant.id, name = %plant.name, "Plant created");
        PlantView::from_plant(&plant)
    }

    pub async fn water_plant(&self, owner_id: &str, plant_id: &str, now: NaiveDate) -> PlantResult<PlantView> {
        let mut plant = self
            .store
            .get_plant(owner_id, plant_id)
            .await?
            .ok_or(PlantError::NotFound("Plant"))?;

        plant.last_watered = now;
        // Derived before the write so an out-of-range date is never stored.
        let view = PlantView::from_plant(&plant)?;
        // Deleted between the read and the write.
        if !self.store.update_plant(&plant).await? {
            return Err(PlantError::NotFound("Plant"));
        }
        tracing::info!(owner_id, plant_id, last_watered = %now, "Plant watered");
        Ok(view)
    }

    /// Deleting a plant that does not exist for this owner is `NotFound`.
    pub async fn delete_plant(&self, owner_id: &str, plant_id: &str) -> PlantResult<()> {
        if !self.store.delete_plant(owner_id, plant_id).await? {
            return Err(PlantError::NotFound("Plant"));
        }
        tracing::info!(owner_id, plant_id, "Plant deleted");
        Ok(())
    }

    /// Plants whose schedule cannot be computed are left out with a warning,
    /// the same way the overdue scan treats them.
    pub async fn list_plants(&self, owner_id: &str) -> PlantResult<Vec<PlantView>> {
        let plants = self.store.list_plants(owner_id).await?;
        Ok(plants
            .iter()
            .filter_map(|plant| match PlantView::from_plant(plant) {
                Ok(view) => Some(view),
                Err(e) => {
                    tracing::warn!(plant_id = %plant.id, error = %e, "Skipping plant with invalid schedule");
                    None
                }
            })
            .collect())
    }
}
