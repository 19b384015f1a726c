//! Unit tests for the Redis cache module
