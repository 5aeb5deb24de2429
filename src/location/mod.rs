//! Geolocation boundary
//!
//! A single-shot position request with a timeout. Fixes are never cached:
//! every call asks the provider again.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::Result;
use crate::geo::Coordinate;

/// Default time allowed for a position fix
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A position fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub coordinate: Coordinate,
    /// Accuracy radius in metres, if the provider reports one
    pub accuracy_m: Option<f64>,
}

/// Why a position fix could not be obtained
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    Unavailable,

    #[error("timed out")]
    Timeout,
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "Location access denied. Please enable location services."
            }
            LocationError::Unavailable => "Location information is unavailable.",
            LocationError::Timeout => "Location request timed out.",
        }
    }
}

/// Source of position fixes
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Request the current position
    async fn current_position(&self) -> std::result::Result<Fix, LocationError>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Request one fix from `provider`, giving up after `timeout`
pub async fn locate(provider: &dyn LocationProvider, timeout: Duration) -> Result<Fix> {
    info!("Requesting position from {}", provider.name());

    let fix = match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Ok(fix)) => fix,
        Ok(Err(e)) => {
            warn!("Position request failed: {}", e);
            return Err(e.into());
        }
        Err(_) => {
            warn!("Position request timed out after {:?}", timeout);
            return Err(LocationError::Timeout.into());
        }
    };

    info!(
        "Position fix: {:.5}, {:.5}",
        fix.coordinate.latitude, fix.coordinate.longitude
    );

    Ok(fix)
}

/// Provider that always answers with the same position (or none)
#[derive(Debug, Clone)]
pub struct FixedLocation {
    fix: Option<Fix>,
}

impl FixedLocation {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            fix: Some(Fix {
                coordinate,
                accuracy_m: None,
            }),
        }
    }

    /// A provider with no position available
    pub fn unavailable() -> Self {
        Self { fix: None }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> std::result::Result<Fix, LocationError> {
        self.fix.ok_or(LocationError::Unavailable)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Denied;

    #[async_trait]
    impl LocationProvider for Denied {
        async fn current_position(&self) -> std::result::Result<Fix, LocationError> {
            Err(LocationError::PermissionDenied)
        }

        fn name(&self) -> &str {
            "denied"
        }
    }

    struct Stalled;

    #[async_trait]
    impl LocationProvider for Stalled {
        async fn current_position(&self) -> std::result::Result<Fix, LocationError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_fixed_location_returns_fix() {
        let here = Coordinate::new(48.8566, 2.3522).unwrap();
        let fix = locate(&FixedLocation::new(here), DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(fix.coordinate, here);
    }

    #[tokio::test]
    async fn test_unavailable_location() {
        let err = locate(&FixedLocation::unavailable(), DEFAULT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LocationUnavailable(LocationError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_permission_denied_is_surfaced() {
        let err = locate(&Denied, DEFAULT_TIMEOUT).await.unwrap_err();
        assert!(matches!(
            err,
            Error::LocationUnavailable(LocationError::PermissionDenied)
        ));
        assert_eq!(
            err.user_message(),
            "Location access denied. Please enable location services."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_provider_times_out() {
        let err = locate(&Stalled, DEFAULT_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::LocationUnavailable(LocationError::Timeout)));
    }
}
