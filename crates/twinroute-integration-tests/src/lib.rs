//! End-to-end tests for TwinRoute
//!
//! The tests in `tests/` build the real router from a `ServerConfig` whose
//! routes point at wiremock servers, then drive it with `tower::ServiceExt::oneshot`.
