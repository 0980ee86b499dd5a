use std::sync::Arc;

use crate::application::services::{
    BulkConversionService, ImageConversionService, JobStatusService,
};

#[derive(Clone)]
pub struct AppState {
    pub bulk_conversion_service: Arc<BulkConversionService>,
    pub job_status_service: Arc<JobStatusService>,
    pub image_conversion_service: Arc<ImageConversionService>,
}
