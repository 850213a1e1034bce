mod bulk_import;
mod payment_codes;

pub use bulk_import::{split_bulk_text, validate_secret_data, BulkImport, MAX_SECRET_LENGTH, MIN_SECRET_LENGTH};
pub use payment_codes::{
    extract_deposit_code,
    extract_order_code,
    new_batch_id,
    new_deposit_code,
    order_payment_code,
};
