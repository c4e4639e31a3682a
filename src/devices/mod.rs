pub mod pk9019;
pub mod temp_humidity;
pub mod traits;

pub use pk9019::{ChannelReading, Pk9019Data, Pk9019Device};
pub use temp_humidity::{TempHumidityData, TempHumidityDevice};
pub use traits::{Device, DeviceData};
