// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod dashboard;
pub mod digest;
pub mod rows;
pub mod schedule;

pub use dashboard::*;
pub use digest::*;
pub use rows::*;
pub use schedule::*;
