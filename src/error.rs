use thiserror::Error;

/// Failures that abort normalization of one company's bundle.
///
/// Missing line items are not errors; they surface as absent fields.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Malformed bundle for {company}: {reason}")]
    MalformedBundle { company: String, reason: String },

    #[error("Malformed period date '{date}' in {company} income statement")]
    MalformedDate { company: String, date: String },
}
