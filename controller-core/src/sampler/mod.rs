//! Supply-voltage classification.
//!
//! The ADC front end divides the vehicle supply by three before it reaches a
//! 5 V referenced 8-bit conversion, so one raw unit is roughly 59 mV at the
//! battery terminals. Classification is a single comparison against two fixed
//! thresholds; debouncing lives in the controller's timeout, not here.

use core::fmt;

/// ADC reference voltage in millivolts.
pub const ADC_REFERENCE_MV: u32 = 5_000;
/// Ratio of the external resistor divider feeding the ADC pin.
pub const SUPPLY_DIVIDER_RATIO: u32 = 3;

const FULL_SCALE: u32 = u8::MAX as u32;
const FULL_SCALE_SUPPLY_MV: u32 = ADC_REFERENCE_MV * SUPPLY_DIVIDER_RATIO;

/// Samples at or below this level mean the battery is close to damage (~12.4 V).
pub const BATTERY_LOW_THRESHOLD: RawSample = RawSample::new(211);
/// Samples at or above this level mean the alternator is charging (~13.2 V).
pub const ALTERNATOR_ON_THRESHOLD: RawSample = RawSample::new(225);

/// One 8-bit supply-voltage reading.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RawSample(u8);

impl RawSample {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(u8::MAX);

    /// Wraps a raw conversion result.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw conversion result.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Approximate supply voltage at the battery, in millivolts.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn supply_millivolts(self) -> u16 {
        // 255 * 15_000 fits comfortably in u32; the quotient is at most 15_000.
        (self.0 as u32 * FULL_SCALE_SUPPLY_MV / FULL_SCALE) as u16
    }

    /// Nearest raw reading for a supply voltage, saturating at full scale.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_supply_millivolts(millivolts: u32) -> Self {
        if millivolts >= FULL_SCALE_SUPPLY_MV {
            return Self::MAX;
        }
        let scaled = (millivolts * FULL_SCALE + FULL_SCALE_SUPPLY_MV / 2) / FULL_SCALE_SUPPLY_MV;
        Self(scaled as u8)
    }
}

impl From<u8> for RawSample {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<RawSample> for u8 {
    fn from(sample: RawSample) -> Self {
        sample.value()
    }
}

impl fmt::Display for RawSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millivolts = self.supply_millivolts();
        write!(
            f,
            "{} (~{}.{:02} V)",
            self.0,
            millivolts / 1_000,
            (millivolts % 1_000) / 10
        )
    }
}

/// Qualitative voltage regime derived from one [`RawSample`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum VoltageRegime {
    AlternatorOn,
    AlternatorOff,
    BatteryLow,
}

impl VoltageRegime {
    /// Short log label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            VoltageRegime::AlternatorOn => "alternator-on",
            VoltageRegime::AlternatorOff => "alternator-off",
            VoltageRegime::BatteryLow => "battery-low",
        }
    }
}

impl fmt::Display for VoltageRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pair of disjoint classification thresholds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VoltageThresholds {
    battery_low: RawSample,
    alternator_on: RawSample,
}

impl VoltageThresholds {
    /// Thresholds used by [`classify`].
    pub const DEFAULT: Self = Self::new(BATTERY_LOW_THRESHOLD, ALTERNATOR_ON_THRESHOLD);

    /// Builds a threshold pair.
    ///
    /// # Panics
    ///
    /// Panics unless `battery_low` is strictly below `alternator_on`. In a
    /// `const` context this is a compile error.
    #[must_use]
    pub const fn new(battery_low: RawSample, alternator_on: RawSample) -> Self {
        assert!(
            battery_low.value() < alternator_on.value(),
            "battery-low threshold must sit below the alternator-on threshold"
        );
        Self {
            battery_low,
            alternator_on,
        }
    }

    /// Highest reading still classified as [`VoltageRegime::BatteryLow`].
    #[must_use]
    pub const fn battery_low(&self) -> RawSample {
        self.battery_low
    }

    /// Lowest reading classified as [`VoltageRegime::AlternatorOn`].
    #[must_use]
    pub const fn alternator_on(&self) -> RawSample {
        self.alternator_on
    }

    /// Classifies a reading against this threshold pair.
    #[must_use]
    pub const fn classify(&self, raw: RawSample) -> VoltageRegime {
        if raw.value() <= self.battery_low.value() {
            VoltageRegime::BatteryLow
        } else if raw.value() < self.alternator_on.value() {
            VoltageRegime::AlternatorOff
        } else {
            VoltageRegime::AlternatorOn
        }
    }
}

impl Default for VoltageThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Classifies a reading against the fixed production thresholds.
#[must_use]
pub const fn classify(raw: RawSample) -> VoltageRegime {
    VoltageThresholds::DEFAULT.classify(raw)
}
