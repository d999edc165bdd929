//! Trait seams to everything outside this crate's control: the design
//! API, the headless renderer, DSL serialization, and perceptual color
//! distance. Each trait has exactly one production adapter here plus
//! whatever fakes the test suite needs.

pub mod circuit_breaker;
pub mod color;
pub mod dsl;
pub mod http_client;
pub mod renderer;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use color::{Cie76, ColorDistance};
pub use dsl::{DslEmitter, FidelityDslEmitter, HtmlDslEmitter, RawDslEmitter};
pub use http_client::{DesignApiClient, HttpClientConfig, HttpDesignApiClient};
pub use renderer::{Renderer, SubprocessRenderer};
