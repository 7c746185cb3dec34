use sluice_pipeline::{Ingestor, NoResource};

use crate::cmd::{close_backend, open_backend};
use crate::config::{IngestArgs, ServerConfig};
use crate::error::ServerError;

/// Ingest a local file. The file belongs to the caller and is left in
/// place.
pub async fn run(args: IngestArgs) -> Result<(), ServerError> {
    let mut config = ServerConfig::load(&args.common)?;
    if let Some(index) = args.index {
        config.ingest.index = index;
    }
    if let Some(batch_size) = args.batch_size {
        config.ingest.batch_size = batch_size;
    }

    let path = args.file.display().to_string();
    let file = tokio::fs::File::open(&args.file)
        .await
        .map_err(|source| ServerError::Input { path: path.clone(), source })?;

    let backend = open_backend(&config).await?;
    let result = match Ingestor::new(backend, config.ingest.clone()) {
        Ok(ingestor) => ingestor.ingest(file, &config.ingest.index, NoResource).await,
        Err(e) => Err(e),
    };
    close_backend(&config);

    let report = result?;
    println!(
        "{path}: {} rows into '{}' ({} bulk requests, {} rejected)",
        report.rows_processed, config.ingest.index, report.flushes, report.rejected
    );
    if !report.header.unknown.is_empty() {
        println!("not filterable: {}", report.header.unknown.join(", "));
    }
    Ok(())
}
