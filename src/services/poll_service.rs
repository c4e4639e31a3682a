use log::{error, info};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::settings::{self, Config};
use crate::devices::pk9019::Pk9019Device;
use crate::devices::temp_humidity::TempHumidityDevice;
use crate::devices::traits::{Device, DeviceData};
use crate::modbus::client::ModbusClient;
use crate::utils::error::ModbusError;

/// One configured device with its own session. Connections are never shared;
/// each slot dials (and redials) independently.
struct DeviceSlot {
    device: Box<dyn Device>,
    client: ModbusClient,
}

pub struct PollService {
    config: Config,
    slots: Vec<DeviceSlot>,
    latest: HashMap<String, Box<dyn DeviceData>>,
}

impl PollService {
    pub fn new(config: Config) -> Result<Self, ModbusError> {
        config.validate()?;
        info!("🚀 Initializing poll service");

        let options = config.client_options();
        let mut slots = Vec::new();
        for device_config in &config.devices {
            if !device_config.enabled {
                info!(
                    "⏸️  Device '{}' at {}:{} is disabled",
                    device_config.name, device_config.host, device_config.port
                );
                continue;
            }

            let device: Box<dyn Device> = match device_config.device_type.as_str() {
                settings::DEVICE_TYPE_PK9019 => Box::new(Pk9019Device::new(
                    device_config.slave_address,
                    device_config.name.clone(),
                )),
                settings::DEVICE_TYPE_TEMP_HUMIDITY => Box::new(TempHumidityDevice::new(
                    device_config.slave_address,
                    device_config.name.clone(),
                )),
                other => {
                    return Err(ModbusError::ConfigError(format!(
                        "unknown device_type '{}'",
                        other
                    )))
                }
            };

            info!(
                "📋 Registered {} '{}' at {}:{} (slave {})",
                device.device_type(),
                device.name(),
                device_config.host,
                device_config.port,
                device_config.slave_address
            );
            slots.push(DeviceSlot {
                device,
                client: ModbusClient::new(&device_config.host, device_config.port, options.clone()),
            });
        }

        info!("✅ Poll service ready, {} device(s) active", slots.len());
        Ok(Self {
            config,
            slots,
            latest: HashMap::new(),
        })
    }

    /// Poll every active device once. A failing device is logged and skipped
    /// for this cycle; its session redials on the next one.
    pub async fn read_all_devices_once(&mut self) {
        for slot in &self.slots {
            match slot.device.read_data(&slot.client).await {
                Ok(data) => {
                    info!(
                        "📥 {} '{}' read ok at {}",
                        slot.device.device_type(),
                        slot.device.name(),
                        data.timestamp()
                    );
                    self.latest.insert(slot.device.name().to_string(), data);
                }
                Err(e) if e.is_transport_fatal() => {
                    // Session already dropped its socket; next cycle redials.
                    error!(
                        "❌ {} '{}' unreachable this cycle: {}",
                        slot.device.device_type(),
                        slot.device.name(),
                        e
                    );
                }
                Err(e) => {
                    error!(
                        "❌ {} '{}' returned bad data: {}",
                        slot.device.device_type(),
                        slot.device.name(),
                        e
                    );
                }
            }
        }
    }

    pub fn latest_data(&self, device_name: &str) -> Option<&dyn DeviceData> {
        self.latest.get(device_name).map(|d| d.as_ref())
    }

    pub fn print_latest(&self) {
        for slot in &self.slots {
            match self.latest.get(slot.device.name()) {
                Some(data) => {
                    println!("{} [{}]", data.device_name(), data.timestamp());
                    for (name, value) in data.get_all_parameters() {
                        println!("  {}: {}", name, value);
                    }
                }
                None => println!("{}: no data", slot.device.name()),
            }
        }
    }

    pub fn print_latest_json(&self) {
        for slot in &self.slots {
            if let Some(data) = self.latest.get(slot.device.name()) {
                println!("{}", data.to_json());
            }
        }
    }

    /// Poll forever on the configured interval.
    pub async fn run_continuous(&mut self) {
        let interval = Duration::from_secs(self.config.poll_interval_seconds);
        info!("🔄 Monitoring every {:?}", interval);
        loop {
            self.read_all_devices_once().await;
            self.print_latest();
            sleep(interval).await;
        }
    }

    /// Close every session. Teardown failures are logged inside the client.
    pub async fn shutdown(&mut self) {
        for slot in &self.slots {
            slot.client.close().await;
        }
        info!("👋 Poll service stopped");
    }
}
