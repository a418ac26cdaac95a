//! Maps UI service errors to ncr_core::AppError for consistent user-facing messages.

mod weather;
