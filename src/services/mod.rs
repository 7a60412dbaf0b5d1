//! Business logic services

pub mod checkouts;
pub mod equipment;

use std::sync::Arc;

use crate::{config::CheckoutsConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub checkouts: checkouts::CheckoutsService,
    pub equipment: equipment::EquipmentService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, checkouts_config: CheckoutsConfig) -> Self {
        Self {
            checkouts: checkouts::CheckoutsService::new(
                Arc::new(repository.checkouts.clone()),
                checkouts_config,
            ),
            equipment: equipment::EquipmentService::new(Arc::new(repository.equipment.clone())),
            repository,
        }
    }
}
