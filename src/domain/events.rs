//! Domain events for anomaly lifecycle and analysis runs
//!
//! Events are flat records tagged by `event_type`; subscribers are keyed by
//! that tag.

use crate::domain::identifiers::{AnalysisId, AnomalyId, EventId};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Event type tags as they appear on the wire
pub mod event_types {
    pub const SAA_ANOMALY_DETECTED: &str = "saa_anomaly_detected";
    pub const SAA_ANOMALY_INTENSITY_CHANGED: &str = "saa_anomaly_intensity_changed";
    pub const SAA_ANOMALY_POSITION_CHANGED: &str = "saa_anomaly_position_changed";
    pub const SAA_ANOMALIES_MERGED: &str = "saa_anomalies_merged";
    pub const SAA_ANOMALY_EXPIRED: &str = "saa_anomaly_expired";
    pub const FLUX_DATA_UPDATED: &str = "flux_data_updated";
    pub const ANALYSIS_COMPLETED: &str = "analysis_completed";
    pub const DATA_QUALITY_ALERT: &str = "data_quality_alert";
    pub const SYSTEM_HEALTH_ALERT: &str = "system_health_alert";
}

/// Severity of a data quality alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[display("low")]
    Low,
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
    #[display("critical")]
    Critical,
}

/// Health of a system component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[display("healthy")]
    Healthy,
    #[display("degraded")]
    Degraded,
    #[display("unhealthy")]
    Unhealthy,
}

/// All domain events raised by the SAA analysis core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DomainEvent {
    // Anomaly lifecycle
    SaaAnomalyDetected {
        event_id: EventId,
        anomaly_id: AnomalyId,
        center_longitude: f64,
        center_latitude: f64,
        center_altitude: f64,
        intensity_peak: f64,
        detected_at: DateTime<Utc>,
    },
    SaaAnomalyIntensityChanged {
        event_id: EventId,
        anomaly_id: AnomalyId,
        old_intensity: f64,
        new_intensity: f64,
        intensity_change: f64,
        changed_at: DateTime<Utc>,
    },
    SaaAnomalyPositionChanged {
        event_id: EventId,
        anomaly_id: AnomalyId,
        old_longitude: f64,
        old_latitude: f64,
        old_altitude: f64,
        new_longitude: f64,
        new_latitude: f64,
        new_altitude: f64,
        distance_moved_km: f64,
        changed_at: DateTime<Utc>,
    },
    SaaAnomaliesMerged {
        event_id: EventId,
        original_anomaly_ids: Vec<AnomalyId>,
        merged_anomaly_id: AnomalyId,
        anomalies_count: usize,
        merged_at: DateTime<Utc>,
    },
    SaaAnomalyExpired {
        event_id: EventId,
        anomaly_id: AnomalyId,
        last_detected_at: DateTime<Utc>,
        expired_at: DateTime<Utc>,
        reason: String,
    },

    // Data and analysis
    FluxDataUpdated {
        event_id: EventId,
        region: String,
        data_source: String,
        points_updated: usize,
        updated_at: DateTime<Utc>,
    },
    AnalysisCompleted {
        event_id: EventId,
        analysis_id: AnalysisId,
        region_analyzed: String,
        anomalies_found: usize,
        processing_time_seconds: f64,
        completed_at: DateTime<Utc>,
    },

    // Alerts
    DataQualityAlert {
        event_id: EventId,
        data_source: String,
        quality_issue: String,
        affected_region: String,
        severity: Severity,
        alerted_at: DateTime<Utc>,
    },
    SystemHealthAlert {
        event_id: EventId,
        component: String,
        health_status: HealthStatus,
        message: String,
        metrics: BTreeMap<String, f64>,
        alerted_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn analysis_completed(
        analysis_id: AnalysisId,
        region_analyzed: String,
        anomalies_found: usize,
        processing_time_seconds: f64,
    ) -> Self {
        Self::AnalysisCompleted {
            event_id: EventId::generate(),
            analysis_id,
            region_analyzed,
            anomalies_found,
            processing_time_seconds,
            completed_at: Utc::now(),
        }
    }

    pub fn data_quality_alert(
        data_source: impl Into<String>,
        quality_issue: impl Into<String>,
        affected_region: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self::DataQualityAlert {
            event_id: EventId::generate(),
            data_source: data_source.into(),
            quality_issue: quality_issue.into(),
            affected_region: affected_region.into(),
            severity,
            alerted_at: Utc::now(),
        }
    }

    pub fn flux_data_updated(
        region: impl Into<String>,
        data_source: impl Into<String>,
        points_updated: usize,
    ) -> Self {
        Self::FluxDataUpdated {
            event_id: EventId::generate(),
            region: region.into(),
            data_source: data_source.into(),
            points_updated,
            updated_at: Utc::now(),
        }
    }

    pub fn system_health_alert(
        component: impl Into<String>,
        health_status: HealthStatus,
        message: impl Into<String>,
        metrics: BTreeMap<String, f64>,
    ) -> Self {
        Self::SystemHealthAlert {
            event_id: EventId::generate(),
            component: component.into(),
            health_status,
            message: message.into(),
            metrics,
            alerted_at: Utc::now(),
        }
    }

    /// Tag used for subscription lookup
    pub fn event_type(&self) -> &'static str {
        use event_types::*;
        match self {
            Self::SaaAnomalyDetected { .. } => SAA_ANOMALY_DETECTED,
            Self::SaaAnomalyIntensityChanged { .. } => SAA_ANOMALY_INTENSITY_CHANGED,
            Self::SaaAnomalyPositionChanged { .. } => SAA_ANOMALY_POSITION_CHANGED,
            Self::SaaAnomaliesMerged { .. } => SAA_ANOMALIES_MERGED,
            Self::SaaAnomalyExpired { .. } => SAA_ANOMALY_EXPIRED,
            Self::FluxDataUpdated { .. } => FLUX_DATA_UPDATED,
            Self::AnalysisCompleted { .. } => ANALYSIS_COMPLETED,
            Self::DataQualityAlert { .. } => DATA_QUALITY_ALERT,
            Self::SystemHealthAlert { .. } => SYSTEM_HEALTH_ALERT,
        }
    }

    pub fn event_id(&self) -> &EventId {
        match self {
            Self::SaaAnomalyDetected { event_id, .. }
            | Self::SaaAnomalyIntensityChanged { event_id, .. }
            | Self::SaaAnomalyPositionChanged { event_id, .. }
            | Self::SaaAnomaliesMerged { event_id, .. }
            | Self::SaaAnomalyExpired { event_id, .. }
            | Self::FluxDataUpdated { event_id, .. }
            | Self::AnalysisCompleted { event_id, .. }
            | Self::DataQualityAlert { event_id, .. }
            | Self::SystemHealthAlert { event_id, .. } => event_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::SaaAnomalyDetected { detected_at, .. } => *detected_at,
            Self::SaaAnomalyIntensityChanged { changed_at, .. }
            | Self::SaaAnomalyPositionChanged { changed_at, .. } => *changed_at,
            Self::SaaAnomaliesMerged { merged_at, .. } => *merged_at,
            Self::SaaAnomalyExpired { expired_at, .. } => *expired_at,
            Self::FluxDataUpdated { updated_at, .. } => *updated_at,
            Self::AnalysisCompleted { completed_at, .. } => *completed_at,
            Self::DataQualityAlert { alerted_at, .. }
            | Self::SystemHealthAlert { alerted_at, .. } => *alerted_at,
        }
    }

    /// Flat field set of the event, without the type tag
    pub fn fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut fields)) => {
                fields.remove("event_type");
                fields
            }
            _ => Map::new(),
        }
    }
}
