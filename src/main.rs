use anyhow::{Context, Result};
use tracing::{error, info};

use tzprobe::backend::connector_for;
use tzprobe::config::{Config, OutputFormat};
use tzprobe::probe::{run_backend, TimestampRoundTripProbe};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    info!("tzprobe v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Default zone {}, reference zone {}, read-back session zone {}",
        config.default_zone, config.reference_zone, config.session_zone
    );

    let probe = TimestampRoundTripProbe::new(config.probe_settings());

    for backend in config.backends() {
        let connector = connector_for(backend, &config);
        let report = match run_backend(connector.as_ref(), &probe).await {
            Ok(report) => report,
            Err(e) => {
                if let Some(code) = e.backend_code() {
                    error!("{} probe failed with backend code {}", backend, code);
                }
                return Err(e).with_context(|| format!("{backend} probe failed"));
            }
        };

        match config.format {
            OutputFormat::Text => println!("{report}"),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }
    }

    Ok(())
}
