use chrono::{DateTime, Utc};
use util::geofence::Coordinates;

use crate::countdown::Countdown;
use crate::error::GateError;
use crate::lookup::{ActiveCode, ActiveCodeLookup};
use crate::network::{NetworkInfo, NetworkProbe};

/// Why the scan button stays disabled.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockReason {
    LocationUnavailable,
    OutsideGeofence { distance_m: f64 },
    NetworkRejected,
    NoActiveCode,
    CodeExpired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    pub allowed: bool,
    /// Every failing gate, not only the first.
    pub reasons: Vec<BlockReason>,
    pub code: Option<ActiveCode>,
    /// `m:ss` or `EXPIRED`; `None` without an active code.
    pub countdown: Option<String>,
}

/// Combines location, network and code state into one scan decision.
pub struct GateOrchestrator<L, N> {
    lookup: L,
    probe: N,
}

impl<L, N> GateOrchestrator<L, N>
where
    L: ActiveCodeLookup,
    N: NetworkProbe,
{
    pub fn new(lookup: L, probe: N) -> Self {
        Self { lookup, probe }
    }

    /// Fetches the active code and decides. Lookup failures are returned as
    /// errors rather than folded into a decision.
    pub async fn evaluate(
        &self,
        device_location: Option<Coordinates>,
        network: &NetworkInfo,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, GateError> {
        let code = self.lookup.active_code().await?;
        Ok(self.decide(code, device_location, network, now))
    }

    pub fn decide(
        &self,
        code: Option<ActiveCode>,
        device_location: Option<Coordinates>,
        network: &NetworkInfo,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let mut reasons = Vec::new();
        let device = device_location.filter(Coordinates::is_valid);

        if device.is_none() {
            reasons.push(BlockReason::LocationUnavailable);
        }

        let countdown = code.as_ref().map(|c| Countdown::new(c.expires_at));
        match &code {
            None => reasons.push(BlockReason::NoActiveCode),
            Some(c) => {
                if countdown.is_some_and(|cd| cd.is_expired(now)) {
                    reasons.push(BlockReason::CodeExpired);
                }
                if let (Some(fence), Some(device)) = (c.geofence(), device) {
                    if !fence.contains(&device) {
                        reasons.push(BlockReason::OutsideGeofence {
                            distance_m: fence.distance_to(&device),
                        });
                    }
                }
            }
        }

        if !self.probe.on_campus(network) {
            reasons.push(BlockReason::NetworkRejected);
        }

        if !reasons.is_empty() {
            tracing::debug!(?reasons, "Scan blocked");
        }

        GateDecision {
            allowed: reasons.is_empty(),
            reasons,
            countdown: countdown.map(|cd| cd.label(now)),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::CodeLocation;
    use crate::network::WifiHeuristic;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use util::geofence::destination_point;

    struct Fixed(Option<ActiveCode>);

    #[async_trait]
    impl ActiveCodeLookup for Fixed {
        async fn active_code(&self) -> Result<Option<ActiveCode>, GateError> {
            Ok(self.0.clone())
        }
    }

    struct Down;

    #[async_trait]
    impl ActiveCodeLookup for Down {
        async fn active_code(&self) -> Result<Option<ActiveCode>, GateError> {
            Err(GateError::Server {
                status: 500,
                message: "Failed to load active QR code".into(),
            })
        }
    }

    const ANCHOR: Coordinates = Coordinates {
        latitude: 28.6139,
        longitude: 77.2090,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 6, 9, 0, 0).unwrap()
    }

    fn code(radius: Option<f64>) -> ActiveCode {
        ActiveCode {
            id: 1,
            code: "check-in".into(),
            session_type: "check-in".into(),
            generated_at: t0(),
            expires_at: t0() + Duration::minutes(30),
            is_active: true,
            location: radius.map(|r| CodeLocation {
                latitude: ANCHOR.latitude,
                longitude: ANCHOR.longitude,
                radius: r,
            }),
        }
    }

    fn gate(c: Option<ActiveCode>) -> GateOrchestrator<Fixed, WifiHeuristic> {
        GateOrchestrator::new(Fixed(c), WifiHeuristic::default())
    }

    #[tokio::test]
    async fn all_gates_pass_at_anchor() {
        let d = gate(Some(code(Some(100.0))))
            .evaluate(Some(ANCHOR), &NetworkInfo::default(), t0() + Duration::minutes(5))
            .await
            .unwrap();
        assert!(d.allowed, "{:?}", d.reasons);
        assert_eq!(d.countdown.as_deref(), Some("25:00"));
    }

    #[tokio::test]
    async fn code_without_geofence_only_needs_a_fix() {
        let g = gate(Some(code(None)));
        let far = Coordinates::new(-33.9, 18.4);
        let d = g.evaluate(Some(far), &NetworkInfo::default(), t0()).await.unwrap();
        assert!(d.allowed);

        let d = g.evaluate(None, &NetworkInfo::default(), t0()).await.unwrap();
        assert_eq!(d.reasons, vec![BlockReason::LocationUnavailable]);
    }

    #[test]
    fn each_blocking_reason_is_reported() {
        let strict = GateOrchestrator::new(Fixed(None), WifiHeuristic::default().with_fallback(false));
        let outside = destination_point(&ANCHOR, 45.0, 101.0);

        let d = strict.decide(
            Some(code(Some(100.0))),
            Some(outside),
            &NetworkInfo::default(),
            t0() + Duration::minutes(31),
        );
        assert!(!d.allowed);
        assert_eq!(d.countdown.as_deref(), Some("EXPIRED"));
        assert_eq!(d.reasons.len(), 3);
        assert_eq!(d.reasons[0], BlockReason::CodeExpired);
        assert!(matches!(d.reasons[1], BlockReason::OutsideGeofence { distance_m } if distance_m > 100.0));
        assert_eq!(d.reasons[2], BlockReason::NetworkRejected);

        let d = strict.decide(None, None, &NetworkInfo::default(), t0());
        assert_eq!(
            d.reasons,
            vec![
                BlockReason::LocationUnavailable,
                BlockReason::NoActiveCode,
                BlockReason::NetworkRejected
            ]
        );
        assert_eq!(d.countdown, None);
    }

    #[test]
    fn invalid_fix_counts_as_unavailable() {
        let d = gate(None).decide(
            Some(code(None)),
            Some(Coordinates::new(f64::NAN, 0.0)),
            &NetworkInfo::default(),
            t0(),
        );
        assert_eq!(d.reasons, vec![BlockReason::LocationUnavailable]);
    }

    #[tokio::test]
    async fn lookup_errors_propagate() {
        let g = GateOrchestrator::new(Down, WifiHeuristic::default());
        let err = g
            .evaluate(Some(ANCHOR), &NetworkInfo::default(), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Server { status: 500, .. }));
    }
}
