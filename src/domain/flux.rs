//! Particle-flux measurement value objects

use crate::domain::coordinates::GeographicCoordinates;
use crate::domain::errors::ValidationError;
use chrono::{DateTime, Utc};
use derive_more::Display;
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Statistical confidence attached to a measurement or detection, in (0, 1]
#[nutype(
    validate(finite, greater = 0.0, less_or_equal = 1.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Display)
)]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    /// 95% confidence, the default for model-derived flux
    pub fn ninety_five_percent() -> Self {
        Self::try_new(0.95).unwrap_or_else(|_| unreachable!("0.95 is within (0, 1]"))
    }

    /// Checked construction mapped onto the domain error type
    pub fn parse(value: f64) -> Result<Self, ValidationError> {
        Self::try_new(value).map_err(|_| ValidationError::ConfidenceLevel(value))
    }

    /// The lower of two confidence levels
    pub fn min(self, other: Self) -> Self {
        if other.into_inner() < self.into_inner() {
            other
        } else {
            self
        }
    }
}

/// Fraction of repeated analyses in which an anomaly persisted, in [0, 1]
#[nutype(
    validate(finite, greater_or_equal = 0.0, less_or_equal = 1.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Display)
)]
pub struct TemporalStability(f64);

impl TemporalStability {
    pub fn parse(value: f64) -> Result<Self, ValidationError> {
        Self::try_new(value).map_err(|_| ValidationError::TemporalStability(value))
    }
}

/// Name of the model or instrument a measurement came from
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRef)
)]
pub struct DataSource(String);

/// Units for a flux measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum FluxUnits {
    #[default]
    #[display("particles/cm²/s")]
    #[serde(rename = "particles/cm²/s")]
    ParticlesPerCm2PerSecond,
    #[display("particles/cm²/s/sr")]
    #[serde(rename = "particles/cm²/s/sr")]
    ParticlesPerCm2PerSecondPerSr,
    #[display("particles/m²/s")]
    #[serde(rename = "particles/m²/s")]
    ParticlesPerM2PerSecond,
}

/// Quality classification reported by a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    #[display("high")]
    High,
    #[display("medium")]
    Medium,
    #[display("low")]
    Low,
    #[display("unknown")]
    Unknown,
}

impl DataQuality {
    /// High and medium quality data are usable for analysis
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::High | Self::Medium)
    }
}

/// Particle flux with propagated uncertainty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFluxIntensity")]
pub struct FluxIntensity {
    value: f64,
    uncertainty: f64,
    confidence_level: ConfidenceLevel,
    units: FluxUnits,
}

#[derive(Deserialize)]
struct RawFluxIntensity {
    value: f64,
    uncertainty: f64,
    confidence_level: ConfidenceLevel,
    units: FluxUnits,
}

impl TryFrom<RawFluxIntensity> for FluxIntensity {
    type Error = ValidationError;

    fn try_from(raw: RawFluxIntensity) -> Result<Self, Self::Error> {
        Self::with_details(raw.value, raw.uncertainty, raw.confidence_level, raw.units)
    }
}

impl FluxIntensity {
    /// Flux in the default units with 95% confidence
    pub fn new(value: f64, uncertainty: f64) -> Result<Self, ValidationError> {
        Self::with_details(
            value,
            uncertainty,
            ConfidenceLevel::ninety_five_percent(),
            FluxUnits::default(),
        )
    }

    pub fn with_details(
        value: f64,
        uncertainty: f64,
        confidence_level: ConfidenceLevel,
        units: FluxUnits,
    ) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite("flux value"));
        }
        if value < 0.0 {
            return Err(ValidationError::NegativeFlux(value));
        }
        if !uncertainty.is_finite() {
            return Err(ValidationError::NonFinite("flux uncertainty"));
        }
        if uncertainty < 0.0 {
            return Err(ValidationError::NegativeUncertainty(uncertainty));
        }
        Ok(Self {
            value,
            uncertainty,
            confidence_level,
            units,
        })
    }

    pub fn zero(units: FluxUnits) -> Self {
        Self {
            value: 0.0,
            uncertainty: 0.0,
            confidence_level: ConfidenceLevel::ninety_five_percent(),
            units,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence_level
    }

    pub fn units(&self) -> FluxUnits {
        self.units
    }

    /// Sum of two fluxes; uncertainties combine in quadrature and the result
    /// keeps the lower confidence.
    pub fn checked_add(&self, other: &FluxIntensity) -> Result<FluxIntensity, ValidationError> {
        if self.units != other.units {
            return Err(ValidationError::UnitMismatch {
                left: self.units.to_string(),
                right: other.units.to_string(),
            });
        }

        FluxIntensity::with_details(
            self.value + other.value,
            self.uncertainty.hypot(other.uncertainty),
            self.confidence_level.min(other.confidence_level),
            self.units,
        )
    }

    /// Scale value and uncertainty by a non-negative factor
    pub fn scale(&self, factor: f64) -> Result<FluxIntensity, ValidationError> {
        if factor < 0.0 {
            return Err(ValidationError::NegativeScalar(factor));
        }
        FluxIntensity::with_details(
            self.value * factor,
            self.uncertainty * factor,
            self.confidence_level,
            self.units,
        )
    }

    /// True when the value exceeds `sigma_threshold` standard uncertainties
    pub fn is_significant(&self, sigma_threshold: f64) -> bool {
        self.value > sigma_threshold * self.uncertainty
    }
}

/// Particle species supported by spectrum queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ParticleType {
    #[display("electron")]
    Electron,
    #[display("proton")]
    Proton,
    #[display("alpha")]
    Alpha,
    #[display("heavy_ion")]
    HeavyIon,
}

impl FromStr for ParticleType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "electron" => Ok(Self::Electron),
            "proton" => Ok(Self::Proton),
            "alpha" => Ok(Self::Alpha),
            "heavy_ion" => Ok(Self::HeavyIon),
            other => Err(ValidationError::ParticleType(other.to_string())),
        }
    }
}

/// One bin of an energy spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyBin {
    /// Bin energy (MeV)
    pub energy_mev: f64,
    /// Integral flux in the bin
    pub flux: f64,
}

/// Energy-dependent flux for one particle species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnergySpectrum")]
pub struct EnergySpectrum {
    bins: Vec<EnergyBin>,
    particle_type: ParticleType,
    spectral_index: Option<f64>,
}

#[derive(Deserialize)]
struct RawEnergySpectrum {
    bins: Vec<EnergyBin>,
    particle_type: ParticleType,
    spectral_index: Option<f64>,
}

impl TryFrom<RawEnergySpectrum> for EnergySpectrum {
    type Error = ValidationError;

    fn try_from(raw: RawEnergySpectrum) -> Result<Self, Self::Error> {
        Self::new(raw.bins, raw.particle_type, raw.spectral_index)
    }
}

impl EnergySpectrum {
    pub fn new(
        bins: Vec<EnergyBin>,
        particle_type: ParticleType,
        spectral_index: Option<f64>,
    ) -> Result<Self, ValidationError> {
        if bins.is_empty() {
            return Err(ValidationError::EnergySpectrum(
                "energy bins cannot be empty".to_string(),
            ));
        }
        for bin in &bins {
            if !(bin.energy_mev.is_finite() && bin.energy_mev > 0.0) {
                return Err(ValidationError::EnergySpectrum(format!(
                    "energy must be positive: {}",
                    bin.energy_mev
                )));
            }
            if !(bin.flux.is_finite() && bin.flux >= 0.0) {
                return Err(ValidationError::EnergySpectrum(format!(
                    "flux cannot be negative: {}",
                    bin.flux
                )));
            }
        }
        Ok(Self {
            bins,
            particle_type,
            spectral_index,
        })
    }

    pub fn bins(&self) -> &[EnergyBin] {
        &self.bins
    }

    pub fn particle_type(&self) -> ParticleType {
        self.particle_type
    }

    pub fn spectral_index(&self) -> Option<f64> {
        self.spectral_index
    }

    /// Sum of bin fluxes whose energy lies in `[min_mev, max_mev]`
    pub fn integrate_over_energy(&self, min_mev: f64, max_mev: f64) -> Result<f64, ValidationError> {
        if min_mev >= max_mev {
            return Err(ValidationError::EnergySpectrum(
                "min energy must be less than max energy".to_string(),
            ));
        }
        Ok(self
            .bins
            .iter()
            .filter(|bin| (min_mev..=max_mev).contains(&bin.energy_mev))
            .map(|bin| bin.flux)
            .sum())
    }
}

/// A complete flux measurement at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFluxData")]
pub struct FluxData {
    location: GeographicCoordinates,
    electron_flux: FluxIntensity,
    proton_flux: FluxIntensity,
    timestamp: DateTime<Utc>,
    data_quality: DataQuality,
    data_source: DataSource,
    energy_spectrum: Option<EnergySpectrum>,
    /// Field strength at the measurement point (nT)
    magnetic_field_strength: Option<f64>,
}

#[derive(Deserialize)]
struct RawFluxData {
    location: GeographicCoordinates,
    electron_flux: FluxIntensity,
    proton_flux: FluxIntensity,
    timestamp: DateTime<Utc>,
    data_quality: DataQuality,
    data_source: String,
    energy_spectrum: Option<EnergySpectrum>,
    magnetic_field_strength: Option<f64>,
}

impl TryFrom<RawFluxData> for FluxData {
    type Error = ValidationError;

    fn try_from(raw: RawFluxData) -> Result<Self, Self::Error> {
        let mut data = Self::new(
            raw.location,
            raw.electron_flux,
            raw.proton_flux,
            raw.timestamp,
            raw.data_quality,
            &raw.data_source,
        )?;
        if let Some(spectrum) = raw.energy_spectrum {
            data = data.with_energy_spectrum(spectrum);
        }
        match raw.magnetic_field_strength {
            Some(nanotesla) => data.with_magnetic_field_strength(nanotesla),
            None => Ok(data),
        }
    }
}

impl FluxData {
    pub fn new(
        location: GeographicCoordinates,
        electron_flux: FluxIntensity,
        proton_flux: FluxIntensity,
        timestamp: DateTime<Utc>,
        data_quality: DataQuality,
        data_source: &str,
    ) -> Result<Self, ValidationError> {
        let data_source = DataSource::try_new(data_source.to_string())
            .map_err(|_| ValidationError::EmptyDataSource)?;
        Ok(Self {
            location,
            electron_flux,
            proton_flux,
            timestamp,
            data_quality,
            data_source,
            energy_spectrum: None,
            magnetic_field_strength: None,
        })
    }

    pub fn with_energy_spectrum(mut self, spectrum: EnergySpectrum) -> Self {
        self.energy_spectrum = Some(spectrum);
        self
    }

    pub fn with_magnetic_field_strength(mut self, nanotesla: f64) -> Result<Self, ValidationError> {
        if !(nanotesla.is_finite() && nanotesla >= 0.0) {
            return Err(ValidationError::NegativeFieldStrength(nanotesla));
        }
        self.magnetic_field_strength = Some(nanotesla);
        Ok(self)
    }

    /// Same measurement re-stamped at a different time
    pub fn at_time(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn location(&self) -> &GeographicCoordinates {
        &self.location
    }

    pub fn electron_flux(&self) -> &FluxIntensity {
        &self.electron_flux
    }

    pub fn proton_flux(&self) -> &FluxIntensity {
        &self.proton_flux
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn data_quality(&self) -> DataQuality {
        self.data_quality
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    pub fn energy_spectrum(&self) -> Option<&EnergySpectrum> {
        self.energy_spectrum.as_ref()
    }

    pub fn magnetic_field_strength(&self) -> Option<f64> {
        self.magnetic_field_strength
    }

    /// Electron plus proton flux
    pub fn total_flux(&self) -> Result<FluxIntensity, ValidationError> {
        self.electron_flux.checked_add(&self.proton_flux)
    }

    pub fn is_high_quality(&self) -> bool {
        self.data_quality == DataQuality::High
            && self.electron_flux.is_significant(2.0)
            && self.proton_flux.is_significant(2.0)
    }
}

/// Spatial derivative of flux
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFluxGradient")]
pub struct FluxGradient {
    /// per degree of longitude
    d_flux_d_longitude: f64,
    /// per degree of latitude
    d_flux_d_latitude: f64,
    /// per km of altitude
    d_flux_d_altitude: f64,
    gradient_magnitude: f64,
}

#[derive(Deserialize)]
struct RawFluxGradient {
    d_flux_d_longitude: f64,
    d_flux_d_latitude: f64,
    d_flux_d_altitude: f64,
    gradient_magnitude: f64,
}

impl TryFrom<RawFluxGradient> for FluxGradient {
    type Error = ValidationError;

    fn try_from(raw: RawFluxGradient) -> Result<Self, Self::Error> {
        Self::new(
            raw.d_flux_d_longitude,
            raw.d_flux_d_latitude,
            raw.d_flux_d_altitude,
            raw.gradient_magnitude,
        )
    }
}

impl FluxGradient {
    const MAGNITUDE_TOLERANCE: f64 = 1e-10;

    pub fn new(
        d_flux_d_longitude: f64,
        d_flux_d_latitude: f64,
        d_flux_d_altitude: f64,
        gradient_magnitude: f64,
    ) -> Result<Self, ValidationError> {
        let calculated = Self::magnitude_of(d_flux_d_longitude, d_flux_d_latitude, d_flux_d_altitude);
        if (gradient_magnitude - calculated).abs() > Self::MAGNITUDE_TOLERANCE {
            return Err(ValidationError::GradientMagnitude {
                calculated,
                provided: gradient_magnitude,
            });
        }
        Ok(Self {
            d_flux_d_longitude,
            d_flux_d_latitude,
            d_flux_d_altitude,
            gradient_magnitude,
        })
    }

    pub fn from_components(
        d_flux_d_longitude: f64,
        d_flux_d_latitude: f64,
        d_flux_d_altitude: f64,
    ) -> Self {
        Self {
            d_flux_d_longitude,
            d_flux_d_latitude,
            d_flux_d_altitude,
            gradient_magnitude: Self::magnitude_of(
                d_flux_d_longitude,
                d_flux_d_latitude,
                d_flux_d_altitude,
            ),
        }
    }

    fn magnitude_of(dlon: f64, dlat: f64, dalt: f64) -> f64 {
        (dlon * dlon + dlat * dlat + dalt * dalt).sqrt()
    }

    pub fn d_flux_d_longitude(&self) -> f64 {
        self.d_flux_d_longitude
    }

    pub fn d_flux_d_latitude(&self) -> f64 {
        self.d_flux_d_latitude
    }

    pub fn d_flux_d_altitude(&self) -> f64 {
        self.d_flux_d_altitude
    }

    pub fn magnitude(&self) -> f64 {
        self.gradient_magnitude
    }
}
