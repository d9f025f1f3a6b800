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

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use serde_json::Value;

use super::board::{merge, Board};
use super::error::ConfigError;

const DEFAULT_AUDIO_PIN: PinId = PinId(18);
const DEFAULT_MUX_ANALOG_PIN: PinId = PinId(26);
const DEFAULT_ADS_ADDRESS: u8 = 0x48;
const DEFAULT_I2C_FREQUENCY: u32 = 400_000;
const DEFAULT_MAX_VOICES: usize = 6;
const DEFAULT_SAMPLE_RATE: u32 = 22050;
const DEFAULT_BLOCK_SIZE: usize = 512;
const DEFAULT_SOUNDS_DIR: &str = "sounds";
const DEFAULT_VELOCITY: u8 = 100;
const DEFAULT_THRESHOLD: u16 = 3000;
const DEFAULT_SETTLE_US: u32 = 100;
const DEFAULT_PEAK_SAMPLES: u8 = 3;

/// Native ADC pins, in the order mux chips are assigned to them.
const NATIVE_ADC_PINS: [PinId; 3] = [PinId(26), PinId(27), PinId(28)];

/// A board pin, written as "GPn", "n" or "LED" in the layout file.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "RawPin")]
pub struct PinId(u8);

impl PinId {
    /// The on-board LED.
    pub const LED: PinId = PinId(25);

    pub const fn new(number: u8) -> PinId {
        PinId(number)
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl FromStr for PinId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        if name == "LED" {
            return Ok(PinId::LED);
        }
        let number = name.strip_prefix("GP").unwrap_or(&name);
        number
            .parse::<u8>()
            .map(PinId)
            .map_err(|_| ConfigError::InvalidPin(s.to_string()))
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GP{}", self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPin {
    Name(String),
    Number(u8),
}

impl TryFrom<RawPin> for PinId {
    type Error = ConfigError;

    fn try_from(raw: RawPin) -> Result<Self, Self::Error> {
        match raw {
            RawPin::Name(name) => name.parse(),
            RawPin::Number(number) => Ok(PinId(number)),
        }
    }
}

/// A note identifier as written in the layout: a name, a layout index or a
/// MIDI number.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum NoteId {
    Name(String),
    Midi(u8),
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteId::Name(name) => f.write_str(name),
            NoteId::Midi(midi) => write!(f, "{}", midi),
        }
    }
}

/// The audio output transport.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioOut {
    /// An I2S DAC on the bit clock, word select and data pins.
    #[default]
    I2s,
    /// Filtered PWM on a single pin.
    Pwm,
    /// Discard audio, paced in real time.
    Null,
    /// Record to a WAV file.
    Wav,
    /// The host's default output device.
    Cpal,
}

/// I2S pin assignment.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2sPins {
    pub bit_clock: PinId,
    pub word_select: PinId,
    pub data: PinId,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdcKind {
    /// The microcontroller's own converter.
    #[default]
    Native,
    /// An ADS1115 on the I2C bus.
    I2c,
}

impl fmt::Display for AdcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdcKind::Native => "native",
            AdcKind::I2c => "i2c",
        })
    }
}

/// The analog converter used for velocity sensing.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct AdcConfig {
    #[serde(rename = "type", default)]
    kind: AdcKind,
    sda: Option<PinId>,
    scl: Option<PinId>,
    address: Option<u8>,
    frequency: Option<u32>,
}

impl AdcConfig {
    pub fn kind(&self) -> AdcKind {
        self.kind
    }

    pub fn sda(&self) -> Option<PinId> {
        self.sda
    }

    pub fn scl(&self) -> Option<PinId> {
        self.scl
    }

    /// Returns the I2C address of the converter (default: 0x48)
    pub fn address(&self) -> u8 {
        self.address.unwrap_or(DEFAULT_ADS_ADDRESS)
    }

    /// Returns the I2C bus frequency (default: 400 kHz)
    pub fn frequency(&self) -> u32 {
        self.frequency.unwrap_or(DEFAULT_I2C_FREQUENCY)
    }
}

/// How pads are read.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    #[default]
    Button,
    /// Capacitive touch. Not available on this platform, read as buttons.
    Touch,
    Direct,
    MuxTouch,
    MuxScan,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputMode::Button => "button",
            InputMode::Touch => "touch",
            InputMode::Direct => "direct",
            InputMode::MuxTouch => "mux_touch",
            InputMode::MuxScan => "mux_scan",
        })
    }
}

/// Behavior when a note is struck while it's already sounding.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerBehavior {
    /// Restart the sounding voice.
    Cut,
    /// Let the old strike ring and take another voice.
    #[default]
    Polyphonic,
}

/// A digital pin's pad, either just a note or a note with velocity sources.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum PinAssignment {
    Note(NoteId),
    Pad {
        note: NoteId,
        #[serde(default)]
        mux_channel: Option<u8>,
        #[serde(default)]
        adc_pin: Option<PinId>,
        #[serde(default)]
        adc_channel: Option<u8>,
    },
}

impl PinAssignment {
    pub fn note(&self) -> &NoteId {
        match self {
            PinAssignment::Note(note) | PinAssignment::Pad { note, .. } => note,
        }
    }

    pub fn mux_channel(&self) -> Option<u8> {
        match self {
            PinAssignment::Pad { mux_channel, .. } => *mux_channel,
            PinAssignment::Note(_) => None,
        }
    }

    pub fn adc_pin(&self) -> Option<PinId> {
        match self {
            PinAssignment::Pad { adc_pin, .. } => *adc_pin,
            PinAssignment::Note(_) => None,
        }
    }

    pub fn adc_channel(&self) -> Option<u8> {
        match self {
            PinAssignment::Pad { adc_channel, .. } => *adc_channel,
            PinAssignment::Note(_) => None,
        }
    }
}

/// A pad read through a multiplexer without a trigger pin.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PadConfig {
    note: NoteId,
    #[serde(default = "default_pad_mux")]
    mux: String,
    channel: u8,
}

fn default_pad_mux() -> String {
    "a".to_string()
}

impl PadConfig {
    pub fn note(&self) -> &NoteId {
        &self.note
    }

    /// The id of the multiplexer chip, e.g. "a" for mux_a.
    pub fn mux(&self) -> &str {
        &self.mux
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

/// One multiplexer chip. Chips share the select lines and are told apart by
/// their enable lines.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MuxChipConfig {
    enable_pin: Option<PinId>,
    analog_pin: Option<PinId>,
    adc_channel: Option<u8>,
}

impl MuxChipConfig {
    /// The active-low enable line, if the chip has one.
    pub fn enable_pin(&self) -> Option<PinId> {
        self.enable_pin
    }

    /// The native ADC pin reading this chip (default: GP26, GP27, GP28 by chip order).
    pub fn analog_pin(&self, index: usize) -> PinId {
        self.analog_pin
            .unwrap_or(NATIVE_ADC_PINS[index.min(NATIVE_ADC_PINS.len() - 1)])
    }

    /// The ADS1115 input reading this chip (default: the chip's index).
    pub fn adc_channel(&self, index: usize) -> u8 {
        self.adc_channel
            .unwrap_or_else(|| u8::try_from(index.min(3)).unwrap_or(3))
    }
}

/// Multiplexer topology and scanning parameters.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct MuxConfig {
    #[serde(default)]
    select_pins: Vec<PinId>,
    analog_pin: Option<PinId>,
    adc_channel: Option<u8>,
    threshold: Option<u16>,
    settle_us: Option<u32>,
    peak_samples: Option<u8>,
    /// Chips, keyed as "mux_<id>".
    #[serde(flatten)]
    chips: BTreeMap<String, Value>,
}

impl MuxConfig {
    pub fn select_pins(&self) -> &[PinId] {
        &self.select_pins
    }

    /// The native ADC pin for mux_touch (default: GP26)
    pub fn analog_pin(&self) -> PinId {
        self.analog_pin.unwrap_or(DEFAULT_MUX_ANALOG_PIN)
    }

    /// The ADS1115 input for mux_touch (default: 0)
    pub fn adc_channel(&self) -> u8 {
        self.adc_channel.unwrap_or(0)
    }

    /// Returns the strike threshold for mux_scan (default: 3000)
    pub fn threshold(&self) -> u16 {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    /// Returns the settle time after switching channels in microseconds (default: 100)
    pub fn settle_us(&self) -> u32 {
        self.settle_us.unwrap_or(DEFAULT_SETTLE_US)
    }

    /// Returns how many readings are taken at a strike to find its peak (default: 3)
    pub fn peak_samples(&self) -> u8 {
        self.peak_samples.unwrap_or(DEFAULT_PEAK_SAMPLES).max(1)
    }

    /// The number of channels the select lines can address.
    pub fn channels(&self) -> u32 {
        1u32 << self.select_pins.len().min(16)
    }

    /// Returns the configured chips as (id, config), ordered by id.
    pub fn chips(&self) -> Result<Vec<(String, MuxChipConfig)>, ConfigError> {
        self.chips
            .iter()
            .filter_map(|(key, value)| key.strip_prefix("mux_").map(|id| (id, value)))
            .map(|(id, value)| {
                let chip = MuxChipConfig::deserialize(value).map_err(|e| {
                    ConfigError::mapping("mux", format!("mux_{}: {}", id, e))
                })?;
                Ok((id.to_string(), chip))
            })
            .collect()
    }
}

/// The fully merged hardware configuration: board defaults with the layout's
/// hardware section on top.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct HardwareConfig {
    #[serde(default)]
    audio_out: AudioOut,
    i2s: Option<I2sPins>,
    audio_pin: Option<PinId>,
    record_path: Option<PathBuf>,
    #[serde(default)]
    adc: AdcConfig,
    led_pin: Option<PinId>,
    #[serde(default)]
    input_mode: InputMode,
    #[serde(default)]
    pins: BTreeMap<String, PinAssignment>,
    #[serde(default)]
    pads: Vec<PadConfig>,
    #[serde(default)]
    mux: MuxConfig,
    max_voices: Option<usize>,
    sample_rate: Option<u32>,
    block_size: Option<usize>,
    sounds_dir: Option<PathBuf>,
    default_velocity: Option<u8>,
    #[serde(default)]
    retrigger: RetriggerBehavior,
    #[serde(default)]
    preload_samples: bool,
}

impl HardwareConfig {
    /// Merges the layout's hardware section over the board defaults.
    pub fn resolve(board: &Board, overrides: &Value) -> Result<HardwareConfig, ConfigError> {
        Self::from_value(merge(&board.defaults(), overrides))
    }

    /// Deserializes an already merged configuration.
    pub fn from_value(value: Value) -> Result<HardwareConfig, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Checks the pin names, mux chips and mux channels the configured input
    /// mode will use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = self.pins()?;
        self.mux.chips()?;

        let channels = self.mux.channels();
        match self.input_mode {
            InputMode::MuxTouch if !self.mux.select_pins.is_empty() => {
                for (pin, assignment) in pins {
                    if let Some(channel) = assignment.mux_channel() {
                        if u32::from(channel) >= channels {
                            return Err(ConfigError::mapping(
                                "mux_touch",
                                format!(
                                    "{} uses mux channel {} but only {} are addressable",
                                    pin, channel, channels
                                ),
                            ));
                        }
                    }
                }
            }
            InputMode::MuxScan => {
                if self.mux.select_pins.is_empty() {
                    return Err(ConfigError::mapping("mux_scan", "no select pins configured"));
                }
                if let Some(pad) = self
                    .pads
                    .iter()
                    .find(|pad| u32::from(pad.channel()) >= channels)
                {
                    return Err(ConfigError::mapping(
                        "mux_scan",
                        format!(
                            "{} uses channel {} but only {} are addressable",
                            pad.note(),
                            pad.channel(),
                            channels
                        ),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn audio_out(&self) -> AudioOut {
        self.audio_out
    }

    pub fn i2s(&self) -> Option<&I2sPins> {
        self.i2s.as_ref()
    }

    /// Returns the PWM audio pin (default: GP18)
    pub fn audio_pin(&self) -> PinId {
        self.audio_pin.unwrap_or(DEFAULT_AUDIO_PIN)
    }

    pub fn record_path(&self) -> Option<&PathBuf> {
        self.record_path.as_ref()
    }

    pub fn adc(&self) -> &AdcConfig {
        &self.adc
    }

    pub fn led_pin(&self) -> Option<PinId> {
        self.led_pin
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    /// Returns the digital pin assignments ordered by pin number.
    pub fn pins(&self) -> Result<Vec<(PinId, &PinAssignment)>, ConfigError> {
        let mut pins = self
            .pins
            .iter()
            .map(|(pin, assignment)| Ok((pin.parse::<PinId>()?, assignment)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        pins.sort_by_key(|(pin, _)| *pin);
        Ok(pins)
    }

    pub fn pads(&self) -> &[PadConfig] {
        &self.pads
    }

    pub fn mux(&self) -> &MuxConfig {
        &self.mux
    }

    /// Returns whether any pads are wired up at all.
    pub fn has_inputs(&self) -> bool {
        !self.pins.is_empty() || !self.pads.is_empty()
    }

    /// Returns the size of the voice pool (default: 6)
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES).max(1)
    }

    /// Returns the output sample rate (default: 22050)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE).max(1)
    }

    /// Returns the number of samples per mix block (default: 512)
    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE).max(1)
    }

    /// Returns the sample directory (default: "sounds")
    pub fn sounds_dir(&self) -> PathBuf {
        self.sounds_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOUNDS_DIR))
    }

    /// Returns the velocity used when a pad can't sense one (default: 100)
    pub fn default_velocity(&self) -> u8 {
        self.default_velocity.unwrap_or(DEFAULT_VELOCITY).clamp(1, 127)
    }

    pub fn retrigger(&self) -> RetriggerBehavior {
        self.retrigger
    }

    pub fn preload_samples(&self) -> bool {
        self.preload_samples
    }

    /// Overrides the audio output with a WAV recording.
    pub fn record_to(&mut self, path: PathBuf) {
        self.audio_out = AudioOut::Wav;
        self.record_path = Some(path);
    }

    /// Relocates a relative sounds directory next to the layout file.
    pub fn relative_to(&mut self, base: &Path) {
        let sounds_dir = self.sounds_dir();
        if sounds_dir.is_relative() {
            self.sounds_dir = Some(base.join(sounds_dir));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_pin_names() {
        assert_eq!("GP26".parse::<PinId>().unwrap(), PinId(26));
        assert_eq!("gp4".parse::<PinId>().unwrap(), PinId(4));
        assert_eq!("7".parse::<PinId>().unwrap(), PinId(7));
        assert_eq!("led".parse::<PinId>().unwrap(), PinId::LED);
        assert!("D7".parse::<PinId>().is_err());
        assert!("GP".parse::<PinId>().is_err());
        assert_eq!(PinId(26).to_string(), "GP26");
    }

    #[test]
    fn test_resolve_pico_defaults() {
        let config = HardwareConfig::resolve(&Board::new("raspberry_pi_pico"), &json!({})).unwrap();
        assert_eq!(config.audio_out(), AudioOut::I2s);
        assert_eq!(
            config.i2s(),
            Some(&I2sPins {
                bit_clock: PinId(27),
                word_select: PinId(28),
                data: PinId(26),
            })
        );
        assert_eq!(config.adc().kind(), AdcKind::I2c);
        assert_eq!(config.adc().sda(), Some(PinId(4)));
        assert_eq!(config.adc().address(), 0x48);
        assert_eq!(config.led_pin(), Some(PinId::LED));
        assert_eq!(config.max_voices(), 6);
        assert_eq!(config.input_mode(), InputMode::Button);
        assert_eq!(config.sample_rate(), 22050);
        assert_eq!(config.block_size(), 512);
        assert_eq!(config.retrigger(), RetriggerBehavior::Polyphonic);
        assert!(!config.has_inputs());

        let mux = config.mux();
        assert_eq!(mux.select_pins(), &[PinId(10), PinId(11), PinId(12), PinId(13)]);
        assert_eq!(mux.threshold(), 3000);
        assert_eq!(mux.settle_us(), 100);
        assert_eq!(mux.peak_samples(), 3);
        let chips = mux.chips().unwrap();
        assert_eq!(chips.len(), 2);
        assert_eq!(chips[0].0, "a");
        assert_eq!(chips[0].1.enable_pin(), Some(PinId(14)));
        assert_eq!(chips[1].0, "b");
        assert_eq!(chips[1].1.enable_pin(), Some(PinId(15)));
        assert_eq!(chips[1].1.adc_channel(1), 1);
        assert_eq!(chips[1].1.analog_pin(1), PinId(27));
    }

    #[test]
    fn test_resolve_overrides() {
        let config = HardwareConfig::resolve(
            &Board::new("raspberry_pi_pico"),
            &json!({
                "i2s": {"data": "GP2"},
                "input_mode": "mux_scan",
                "max_voices": 4,
                "mux": {"threshold": 5000, "mux_b": {"adc_channel": 3}},
                "pads": [
                    {"note": "C4", "mux": "a", "channel": 0},
                    {"note": 62, "channel": 1},
                ],
            }),
        )
        .unwrap();

        assert_eq!(config.i2s().unwrap().data, PinId(2));
        assert_eq!(config.i2s().unwrap().bit_clock, PinId(27));
        assert_eq!(config.input_mode(), InputMode::MuxScan);
        assert_eq!(config.max_voices(), 4);
        assert_eq!(config.mux().threshold(), 5000);
        let chips = config.mux().chips().unwrap();
        assert_eq!(chips[1].1.enable_pin(), Some(PinId(15)));
        assert_eq!(chips[1].1.adc_channel(1), 3);
        assert_eq!(config.pads().len(), 2);
        assert_eq!(config.pads()[1].note(), &NoteId::Midi(62));
        assert_eq!(config.pads()[1].mux(), "a");
        assert!(config.has_inputs());
    }

    #[test]
    fn test_pin_assignments() {
        let config = HardwareConfig::from_value(json!({
            "input_mode": "mux_touch",
            "pins": {
                "GP10": {"note": "O2", "mux_channel": 1},
                "GP2": "C4",
                "3": 61,
            },
        }))
        .unwrap();

        let pins = config.pins().unwrap();
        assert_eq!(pins.len(), 3);
        assert_eq!(pins[0].0, PinId(2));
        assert_eq!(pins[0].1.note(), &NoteId::Name("C4".to_string()));
        assert_eq!(pins[0].1.mux_channel(), None);
        assert_eq!(pins[1].0, PinId(3));
        assert_eq!(pins[1].1.note(), &NoteId::Midi(61));
        assert_eq!(pins[2].0, PinId(10));
        assert_eq!(pins[2].1.mux_channel(), Some(1));
    }

    #[test]
    fn test_invalid_pin_assignment() {
        let config = HardwareConfig::from_value(json!({"pins": {"A0": "C4"}})).unwrap();
        assert!(matches!(config.pins(), Err(ConfigError::InvalidPin(_))));

        assert!(HardwareConfig::from_value(json!({"led_pin": "X1"})).is_err());
        assert!(HardwareConfig::from_value(json!({"input_mode": "theremin"})).is_err());
    }

    #[test]
    fn test_validate() {
        let config = HardwareConfig::from_value(json!({"pins": {"GP2": "C4"}})).unwrap();
        assert!(config.validate().is_ok());

        let config = HardwareConfig::from_value(json!({"pins": {"PA7": "C4"}})).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPin(_))));

        let config = HardwareConfig::from_value(json!({
            "mux": {"mux_a": {"enable_pin": "Q9"}},
        }))
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMapping { .. })
        ));

        let config = HardwareConfig::from_value(json!({
            "input_mode": "mux_touch",
            "mux": {"select_pins": ["GP10", "GP11"]},
            "pins": {"GP2": {"note": "C4", "mux_channel": 4}},
        }))
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMapping { mode: "mux_touch", .. })
        ));

        let config = HardwareConfig::from_value(json!({
            "input_mode": "mux_scan",
            "mux": {"select_pins": ["GP10"]},
            "pads": [{"note": "C4", "mux": "a", "channel": 2}],
        }))
        .unwrap();
        assert_eq!(config.mux().channels(), 2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMapping { mode: "mux_scan", .. })
        ));

        let config = HardwareConfig::from_value(json!({
            "input_mode": "mux_scan",
            "pads": [{"note": "C4", "channel": 0}],
        }))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_record_to() {
        let mut config = HardwareConfig::default();
        config.record_to(PathBuf::from("out.wav"));
        assert_eq!(config.audio_out(), AudioOut::Wav);
        assert_eq!(config.record_path(), Some(&PathBuf::from("out.wav")));
    }
}
