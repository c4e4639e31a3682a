use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;

use super::traits::{Device, DeviceData};
use crate::modbus::client::ModbusClientTrait;
use crate::utils::error::ModbusError;

/// Temperature and humidity live in adjacent registers starting at 0.
const TEMP_HUMIDITY_REGISTER: u16 = 0x0000;
const TEMP_HUMIDITY_COUNT: u16 = 2;

/// Combined temperature-humidity probe. Both registers are in tenths.
#[derive(Debug, Clone)]
pub struct TempHumidityDevice {
    pub slave_address: u8,
    pub name: String,
}

impl TempHumidityDevice {
    pub fn new(slave_address: u8, name: String) -> Self {
        Self {
            slave_address,
            name,
        }
    }

    /// One poll: `(temperature °C, relative humidity %)`.
    pub async fn read_temp_humidity(
        &self,
        client: &dyn ModbusClientTrait,
    ) -> Result<(f32, f32), ModbusError> {
        let registers = client
            .read_holding_registers(self.slave_address, TEMP_HUMIDITY_REGISTER, TEMP_HUMIDITY_COUNT)
            .await?;
        Ok((registers[0] as f32 / 10.0, registers[1] as f32 / 10.0))
    }
}

#[async_trait]
impl Device for TempHumidityDevice {
    fn device_type(&self) -> &str {
        "temp_humidity"
    }

    fn slave_address(&self) -> u8 {
        self.slave_address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn read_data(
        &self,
        client: &dyn ModbusClientTrait,
    ) -> Result<Box<dyn DeviceData>, ModbusError> {
        info!(
            "📊 Polling temp-humidity probe '{}' (slave {})",
            self.name, self.slave_address
        );

        let (temperature, humidity) = self.read_temp_humidity(client).await?;
        Ok(Box::new(TempHumidityData {
            device_address: self.slave_address,
            device_name: self.name.clone(),
            timestamp: Utc::now(),
            temperature,
            humidity,
        }))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TempHumidityData {
    pub device_address: u8,
    pub device_name: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: f32,
    pub humidity: f32,
}

impl DeviceData for TempHumidityData {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn device_address(&self) -> u8 {
        self.device_address
    }

    fn device_type(&self) -> String {
        "temp_humidity".to_string()
    }

    fn device_name(&self) -> String {
        self.device_name.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn get_all_parameters(&self) -> Vec<(String, String)> {
        vec![
            ("Temperature".to_string(), format!("{:.1} °C", self.temperature)),
            ("Humidity".to_string(), format!("{:.1} %RH", self.humidity)),
        ]
    }

    fn clone_box(&self) -> Box<dyn DeviceData> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClient(Vec<u16>);

    #[async_trait]
    impl ModbusClientTrait for FixedClient {
        async fn read_holding_registers(
            &self,
            _slave_id: u8,
            start_register: u16,
            _count: u16,
        ) -> Result<Vec<u16>, ModbusError> {
            assert_eq!(start_register, TEMP_HUMIDITY_REGISTER);
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_both_fields_scaled_by_tenths() {
        let device = TempHumidityDevice::new(1, "probe".to_string());
        let (temp, humidity) = device
            .read_temp_humidity(&FixedClient(vec![235, 451]))
            .await
            .unwrap();
        assert_eq!(temp, 23.5);
        assert_eq!(humidity, 45.1);
    }

    #[tokio::test]
    async fn test_read_data_parameters() {
        let device = TempHumidityDevice::new(2, "probe".to_string());
        let data = device
            .read_data(&FixedClient(vec![235, 451]))
            .await
            .unwrap();
        assert_eq!(data.device_address(), 2);
        assert_eq!(
            data.get_all_parameters(),
            vec![
                ("Temperature".to_string(), "23.5 °C".to_string()),
                ("Humidity".to_string(), "45.1 %RH".to_string()),
            ]
        );
    }
}
