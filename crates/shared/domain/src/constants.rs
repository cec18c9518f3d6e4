// OpenAPI tags
pub const SYSTEM_TAG: &str = "system";
pub const CLASSIFICATION_TAG: &str = "classification";

// Request context headers
pub const OPERATOR_HEADER: &str = "x-topo-user";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const ANONYMOUS_OPERATOR: &str = "anonymous";

// Resources
pub const CLASSIFICATION: &str = "classification";
pub const OBJECT: &str = "object";
pub const AUDIT: &str = "audit";

/// `kind` of built-in classifications, which cannot be deleted.
pub const INNER_KIND: &str = "inner";

// Reserved keys of a filter body
pub const PAGE_KEY: &str = "page";
pub const METADATA_KEY: &str = "metadata";

pub const MAX_PAGE_LIMIT: u32 = 1000;
pub const DEFAULT_SORT_FIELD: &str = "id";
