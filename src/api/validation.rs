use super::ApiError;
use crate::security::sanitize::validate_uuid;

pub fn validate_appointment_id(id: &str) -> Result<String, ApiError> {
    validate_uuid(id)
        .map_err(|_| ApiError::validation(format!("Invalid appointment ID: {id}. Expected a UUID")))
}

pub fn validate_page_params(page: u64, page_size: u64) -> Result<(u64, u64), ApiError> {
    const MAX_PAGE_SIZE: u64 = 500;

    if page == 0 {
        return Err(ApiError::validation("Page numbers start at 1"));
    }

    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::validation(format!(
            "Invalid page size: {page_size}. Must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    Ok((page, page_size))
}
