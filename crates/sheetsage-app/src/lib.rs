// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod error;
pub mod ids;
pub mod model;
pub mod render;
pub mod service;
pub mod state;

pub use error::*;
pub use ids::*;
pub use model::*;
pub use render::*;
pub use service::*;
pub use state::*;
