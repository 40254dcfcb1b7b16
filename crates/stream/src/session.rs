//! Transmission session send loop.
//!
//! A session waits for an admission slot, then generates and sends one
//! telemetry packet per iteration until its cancellation token fires. The
//! token is checked once per iteration; send failures are logged and the loop
//! carries on.

use crate::gate::AdmissionGate;
use crate::registry::RegistryInner;
use crate::transport::PacketSender;
use chrono::Utc;
use groundlink_core::{Destination, SessionToken, TelemetryPacket};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Label carried by every generated packet.
pub const PACKET_DESCRIPTION: &str = "Battery Voltage";
/// Unit carried by every generated packet.
pub const PACKET_UNIT: &str = "V";
/// Inclusive range of simulated readings.
pub const VALUE_RANGE: std::ops::RangeInclusive<i64> = 5..=30;

/// Tunables applied to every session of a registry.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Pause after each packet. Zero only yields to the scheduler.
    pub packet_interval: Duration,
}

/// Produce one simulated reading stamped with the current time.
pub fn generate_packet<R: Rng>(rng: &mut R) -> TelemetryPacket {
    TelemetryPacket::new(
        Utc::now(),
        PACKET_DESCRIPTION,
        rng.gen_range(VALUE_RANGE),
        PACKET_UNIT,
    )
}

/// Everything one spawned send loop owns.
pub(crate) struct TransmissionSession {
    pub(crate) token: SessionToken,
    pub(crate) destination: Destination,
    pub(crate) cancel: CancellationToken,
    pub(crate) gate: AdmissionGate,
    pub(crate) registry: Arc<RegistryInner>,
    pub(crate) config: SessionConfig,
}

/// Removes the token from the registry once everything else is released.
struct Deregister {
    token: SessionToken,
    registry: Arc<RegistryInner>,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        self.registry.remove(&self.token);
    }
}

#[derive(Debug, Default)]
struct SendStats {
    sent: u64,
    failed: u64,
}

impl TransmissionSession {
    pub(crate) async fn run(self) {
        let TransmissionSession {
            token,
            destination,
            cancel,
            gate,
            registry,
            config,
        } = self;

        // Declared first so it drops last: socket, then slot, then token.
        let _deregister = Deregister { token, registry };

        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(%token, %destination, "Session cancelled before admission");
                return;
            }
            permit = gate.acquire() => match permit {
                Ok(permit) => permit,
                Err(e) => {
                    warn!(%token, error = %e, "Session could not be admitted");
                    return;
                }
            },
        };

        info!(%token, %destination, running = gate.running(), "Stream started");

        let mut rng = StdRng::from_entropy();
        let mut sender: Option<PacketSender> = None;
        let mut stats = SendStats::default();

        while !cancel.is_cancelled() {
            if sender.is_none() {
                match PacketSender::open(&destination).await {
                    Ok(opened) => {
                        debug!(%token, target = %opened.target(), "Packet sender ready");
                        sender = Some(opened);
                    }
                    Err(e) => {
                        stats.failed += 1;
                        warn!(
                            %token,
                            %destination,
                            error = %e,
                            "Error while opening packet sender"
                        );
                    }
                }
            }

            if let Some(active) = sender.as_ref() {
                let packet = generate_packet(&mut rng);
                match active.send(&packet).await {
                    Ok(_) => stats.sent += 1,
                    Err(e) => {
                        stats.failed += 1;
                        warn!(%token, %destination, error = %e, "Error while sending payload");
                    }
                }
            }

            pace(&cancel, config.packet_interval).await;
        }

        drop(sender);
        debug!(%token, sent = stats.sent, failed = stats.failed, "Send loop finished");
        info!(%token, %destination, "Stream ended");
    }
}

async fn pace(cancel: &CancellationToken, interval: Duration) {
    if interval.is_zero() {
        tokio::task::yield_now().await;
        return;
    }
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(interval) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_packet_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let packet = generate_packet(&mut rng);
            assert_eq!(packet.description, PACKET_DESCRIPTION);
            assert_eq!(packet.unit, PACKET_UNIT);
            let value = packet.value.as_i64().unwrap();
            assert!(VALUE_RANGE.contains(&value));
            assert!(packet.timestamp.ends_with('Z'));
        }
    }
}
