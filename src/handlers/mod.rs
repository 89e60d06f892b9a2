// handlers/mod.rs - two security tiers
//
// Public (no auth)       -> /health
// Protected (JWT bearer) -> /api/v1/*
//
// Every protected handler checks the caller's scope through
// `services::authorize` before touching a service.
pub mod protected;
pub mod public;
