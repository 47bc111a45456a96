//! Crate-level fixtures and behaviour tests.

pub(crate) mod support;
