// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NOVA Protocol — Ordering & YAC Core
//!
//! The consensus-critical nucleus of a permissioned BFT validator node:
//! round algebra, the deterministic permutation oracle, connection
//! management, per-peer proposal ordering, the round state machine (the
//! "gate"), and the YAC voting transport.
//!
//! This crate does not validate transactions, persist blocks, or speak any
//! particular wire protocol — those are external collaborators. What it
//! guarantees is that every honest node derives the same peer bindings,
//! the same round transitions, and the same proposal ordering from the
//! same inputs.
//!
//! ## Architecture
//!
//! - **ordering** — round algebra, permutation oracle, connection manager,
//!   ordering service, and the gate that ties them together.
//! - **yac** — the voting transport: vote-bundle fan-out, reception, and
//!   cooperative shutdown.
//! - **crypto** — BLAKE3 hashing and Ed25519 signing, shared by both.
//! - **storage** — minimal persistence for the hash-window primers and
//!   the validator's signing key.
//! - **config** — layered configuration, in-core and ambient.

pub mod config;
pub mod crypto;
pub mod ordering;
pub mod storage;
pub mod yac;
