mod feedback;
mod transport;
mod url;

pub use feedback::{Execution, FeedbackEnvelope, FinishedResult, StatusBody};
pub use transport::{DownloadOutcome, Transport};
pub use url::api_url;
