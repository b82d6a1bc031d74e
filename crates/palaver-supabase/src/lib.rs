// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hosted backend gateway for Palaver.
//!
//! This crate implements all three gateway traits for a Supabase-style
//! deployment: [`palaver_core::AuthGateway`] over the identity service,
//! [`palaver_core::TableGateway`] over the REST surface, and
//! [`palaver_core::RealtimeGateway`] over the Phoenix websocket. One
//! [`SupabaseClient`] serves all three; clone it freely.

pub mod auth;
pub mod client;
pub mod realtime;
pub mod rest;
mod wire;

pub use client::SupabaseClient;
