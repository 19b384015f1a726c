//! Tests for the token codec, managers and facade

#[cfg(test)]
mod manager_tests;
