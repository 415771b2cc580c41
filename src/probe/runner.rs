use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::{BackendReport, TimestampRoundTripProbe};
use crate::backend::Connector;
use crate::dialect::TABLE_NAME;
use crate::Result;

/// Run the full probe sequence against one backend.
///
/// Every step opens its own connection and drops it when the step ends, whether
/// the step succeeded or not. The first failure aborts the sequence.
pub async fn run_backend(
    connector: &dyn Connector,
    probe: &TimestampRoundTripProbe,
) -> Result<BackendReport> {
    let backend = connector.backend();
    let run_id = Uuid::new_v4();
    let span = info_span!("probe", %backend, %run_id);

    async move {
        let settings = *probe.settings();

        info!("Provisioning {}", TABLE_NAME);
        {
            let mut conn = connector.connect().await?;
            probe.provision(conn.as_mut()).await?;
        }

        let insert = {
            let mut conn = connector.connect().await?;
            probe.insert_sample(conn.as_mut()).await?
        };

        let read = {
            let mut conn = connector.connect().await?;
            probe.read_and_report(conn.as_mut(), &settings.session_zone).await?
        };

        let bind = {
            let mut conn = connector.connect().await?;
            probe
                .probe_explicit_calendar_bind(conn.as_mut(), &settings.reference_zone)
                .await?
        };

        let dst = {
            let mut conn = connector.connect().await?;
            probe.probe_dst_boundary(conn.as_mut(), &settings.reference_zone).await?
        };

        info!("Probe finished");
        Ok(BackendReport {
            backend,
            run_id,
            insert,
            read,
            bind,
            dst,
        })
    }
    .instrument(span)
    .await
}
