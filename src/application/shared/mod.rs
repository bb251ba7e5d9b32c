pub mod api_key_helpers;
pub mod clock;
pub mod throttle;
