//! HTTP surface of the mining stats service.

pub mod router;
