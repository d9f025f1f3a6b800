// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Analog inputs. Every channel reads in the same 0..=65535 domain whatever
//! converter sits behind it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::config::{AdcConfig, AdcKind, PinId};
use crate::hal::{HalError, Platform};

mod ads1115;
mod native;

pub use self::ads1115::{Ads1115, Ads1115Channel, Ads1115Error, DataRate, Gain, SharedAds1115};
pub use self::native::NativeAdc;

/// A single analog input.
pub trait AdcChannel: Send {
    /// Returns the current reading scaled to 0..=65535. Bus faults read as 0.
    fn read(&mut self) -> u16;
}

/// Opens ADC channels for the configured converter. All channels on the
/// external converter share one driver.
pub struct AdcFactory {
    config: AdcConfig,
    ads: Option<SharedAds1115>,
}

impl AdcFactory {
    pub fn new(config: &AdcConfig) -> AdcFactory {
        AdcFactory {
            config: config.clone(),
            ads: None,
        }
    }

    pub fn kind(&self) -> AdcKind {
        self.config.kind()
    }

    /// Opens a channel: the native pin or the ADS1115 input, depending on
    /// the configured converter.
    pub fn open(
        &mut self,
        platform: &mut dyn Platform,
        native_pin: PinId,
        ads_channel: u8,
    ) -> Result<Box<dyn AdcChannel>, HalError> {
        match self.config.kind() {
            AdcKind::Native => self.native(platform, native_pin),
            AdcKind::I2c => self.ads(platform, ads_channel),
        }
    }

    /// Opens a native ADC pin.
    pub fn native(
        &mut self,
        platform: &mut dyn Platform,
        pin: PinId,
    ) -> Result<Box<dyn AdcChannel>, HalError> {
        Ok(Box::new(NativeAdc::new(pin, platform.analog_pin(pin)?)))
    }

    /// Opens an input of the ADS1115, bringing up the I2C bus the first time.
    pub fn ads(
        &mut self,
        platform: &mut dyn Platform,
        channel: u8,
    ) -> Result<Box<dyn AdcChannel>, HalError> {
        if channel > 3 {
            return Err(HalError::Bus(format!("ADS1115 has no input A{}", channel)));
        }
        let device = match &self.ads {
            Some(device) => device.clone(),
            None => {
                let (Some(sda), Some(scl)) = (self.config.sda(), self.config.scl()) else {
                    return Err(HalError::Bus("no SDA/SCL pins configured".to_string()));
                };
                let bus = platform.i2c(sda, scl, self.config.frequency())?;
                let device = Arc::new(Mutex::new(Ads1115::new_with_address(
                    bus,
                    platform.delay(),
                    self.config.address(),
                )));
                info!(
                    sda = %sda,
                    scl = %scl,
                    address = format!("{:#04x}", self.config.address()),
                    "ADS1115 on I2C"
                );
                self.ads = Some(device.clone());
                device
            }
        };
        Ok(Box::new(Ads1115Channel::new(device, channel)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::HardwareConfig;
    use crate::hal::mock::{self, AnalogSource};

    fn adc_config(value: serde_json::Value) -> AdcConfig {
        HardwareConfig::from_value(json!({ "adc": value }))
            .unwrap()
            .adc()
            .clone()
    }

    #[test]
    fn test_factory_shares_ads() {
        let mut platform = mock::Platform::instant();
        let handle = platform.handle();
        handle.set_analog(AnalogSource::Ads(0), 10000);
        handle.set_analog(AnalogSource::Ads(1), 50000);

        let mut factory = AdcFactory::new(&adc_config(json!({
            "type": "i2c", "sda": "GP4", "scl": "GP5",
        })));
        let mut a = factory.open(&mut platform, PinId::new(26), 0).unwrap();
        let mut b = factory.open(&mut platform, PinId::new(27), 1).unwrap();

        assert!((9990..=10010).contains(&a.read()));
        assert!((49990..=50010).contains(&b.read()));
        // One bus for both channels, native pins untouched.
        assert!(handle.is_claimed(PinId::new(4)));
        assert!(!handle.is_claimed(PinId::new(26)));
        assert_eq!(handle.conversions(), 2);
    }

    #[test]
    fn test_factory_native() {
        let mut platform = mock::Platform::instant();
        let handle = platform.handle();
        handle.set_analog(AnalogSource::Pin(PinId::new(27)), 0xFFFF);

        let mut factory = AdcFactory::new(&adc_config(json!({"type": "native"})));
        let mut channel = factory.open(&mut platform, PinId::new(27), 0).unwrap();
        assert_eq!(channel.read(), 0xFFFF);
        assert!(factory.open(&mut platform, PinId::new(27), 0).is_err());
    }

    #[test]
    fn test_factory_errors() {
        let mut platform = mock::Platform::instant();
        let mut factory = AdcFactory::new(&adc_config(json!({"type": "i2c"})));
        assert!(matches!(
            factory.open(&mut platform, PinId::new(26), 0),
            Err(HalError::Bus(_))
        ));
        let mut factory = AdcFactory::new(&adc_config(json!({
            "type": "i2c", "sda": "GP4", "scl": "GP5",
        })));
        assert!(factory.ads(&mut platform, 4).is_err());
    }
}
