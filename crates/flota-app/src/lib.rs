// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod dates;
pub mod due;
pub mod edit;
pub mod forms;
pub mod ids;
pub mod import;
pub mod model;
mod seed;
pub mod text;
mod wire;

pub use due::*;
pub use edit::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use seed::default_lookup_values;
pub use wire::leading_count;
