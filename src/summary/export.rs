use tokio::io::{AsyncWriteExt, BufWriter};

use crate::engine::TestResult;
use crate::error::{AppError, AppResult};

/// Writes `result` as pretty JSON to `path`.
///
/// # Errors
///
/// Returns [`AppError::WriteSummary`] when the file cannot be written.
pub async fn export_summary(path: &str, result: &TestResult) -> AppResult<()> {
    let json = serde_json::to_vec_pretty(result)?;
    write_file(path, &json)
        .await
        .map_err(|err| AppError::WriteSummary {
            path: path.to_owned(),
            source: err,
        })?;
    tracing::info!("Summary written to {}", path);
    Ok(())
}

async fn write_file(path: &str, content: &[u8]) -> Result<(), std::io::Error> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
