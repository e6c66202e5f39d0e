//! Unit tests for remote script execution.

mod script;
