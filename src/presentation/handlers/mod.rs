mod bulk_convert;
mod bulk_status;
mod convert;
mod download;
mod error_response;
mod health;
mod upload_form;

pub use bulk_convert::{BulkConvertResponse, bulk_convert_handler};
pub use bulk_status::{BulkStatusResponse, bulk_status_handler};
pub use convert::convert_handler;
pub use download::download_handler;
pub use error_response::{ErrorResponse, error_response};
pub use health::health_handler;
pub use upload_form::{UploadError, UploadForm, read_upload_form};
