use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::any::Any;

use crate::modbus::client::ModbusClientTrait;
use crate::utils::error::ModbusError;

/// A pollable sensor module behind one Modbus session.
#[async_trait]
pub trait Device: Send + Sync {
    fn device_type(&self) -> &str;
    fn slave_address(&self) -> u8;
    fn name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;

    /// One full poll cycle: every reading the profile exposes, freshly
    /// fetched. Errors surface typed; the next scheduled poll is a fresh
    /// attempt.
    async fn read_data(&self, client: &dyn ModbusClientTrait)
        -> Result<Box<dyn DeviceData>, ModbusError>;
}

/// A decoded snapshot from one poll cycle.
pub trait DeviceData: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn device_address(&self) -> u8;
    fn device_type(&self) -> String;
    fn device_name(&self) -> String;
    fn timestamp(&self) -> DateTime<Utc>;
    fn to_json(&self) -> Value;
    fn get_all_parameters(&self) -> Vec<(String, String)>;
    fn clone_box(&self) -> Box<dyn DeviceData>;
}
