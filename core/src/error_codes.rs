//! Stable, machine-readable error codes.
//!
//! Codes are grouped by the pipeline stage that produces them and never change
//! once published, so scripts can match on them instead of on message text.

pub const INPUT_NOT_FOUND: &str = "PBIX_INPUT_NOT_FOUND";
pub const INPUT_WRONG_EXTENSION: &str = "PBIX_INPUT_WRONG_EXTENSION";

pub const CONTAINER_IO: &str = "PBIX_CONTAINER_IO";
pub const CONTAINER_NOT_ZIP: &str = "PBIX_CONTAINER_NOT_ZIP";
pub const CONTAINER_TOO_MANY_ENTRIES: &str = "PBIX_CONTAINER_TOO_MANY_ENTRIES";
pub const CONTAINER_ENTRY_TOO_LARGE: &str = "PBIX_CONTAINER_ENTRY_TOO_LARGE";
pub const CONTAINER_ENTRY_READ: &str = "PBIX_CONTAINER_ENTRY_READ";

pub const STAGING_CREATE_DIR: &str = "PBIX_STAGING_CREATE_DIR";
pub const STAGING_WRITE_IMAGE: &str = "PBIX_STAGING_WRITE_IMAGE";
pub const STAGING_RELEASE: &str = "PBIX_STAGING_RELEASE";

pub const ENGINE_CONNECT: &str = "PBIX_ENGINE_CONNECT";
pub const ENGINE_QUERY: &str = "PBIX_ENGINE_QUERY";

pub const CONFIG_INVALID: &str = "PBIX_CONFIG_INVALID";
