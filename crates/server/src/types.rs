use serde::Deserialize;
use stockmeta::ExportFormat;

/// Query parameters accepted by `/generate`.
#[derive(Debug, Deserialize, Default)]
pub struct GenerateParams {
    /// Output format; `xlsx` when omitted.
    #[serde(default)]
    pub format: Option<ExportFormat>,
}
