//! Equipment service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    models::equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
    policy::{Actor, Operation},
    repository::EquipmentStore,
};

#[derive(Clone)]
pub struct EquipmentService {
    store: Arc<dyn EquipmentStore>,
}

impl EquipmentService {
    pub fn new(store: Arc<dyn EquipmentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, actor: &Actor, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        actor.require(Operation::ReadEquipment)?;
        self.store.list(query).await
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<Equipment> {
        actor.require(Operation::ReadEquipment)?;
        self.store.get(id).await
    }

    pub async fn create(&self, actor: &Actor, data: &CreateEquipment) -> AppResult<Equipment> {
        actor.require(Operation::WriteEquipment)?;
        data.validate()?;
        self.store.create(data).await
    }

    pub async fn update(&self, actor: &Actor, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        actor.require(Operation::WriteEquipment)?;
        data.validate()?;
        self.store.update(id, data).await
    }

    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require(Operation::WriteEquipment)?;
        self.store.delete(id).await
    }
}
