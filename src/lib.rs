//! LED Remote Control
//!
//! A control surface that mirrors and toggles a remote ESP32 LED through a
//! real-time key-value store (Firebase Realtime Database).
//!
//! This library provides:
//! - Store adapters: Firebase REST/streaming client and an in-memory store
//! - The screen model: subscription callback, command writes, view flags
//! - An event bus feeding Server-Sent Events to clients
//! - HTTP API and a server-rendered screen (Dioxus SSR + Pico CSS)

// =============================================================================
// Lints - Enforce code quality and consistency
// =============================================================================

// Deny truly dangerous patterns (these will fail the build)
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod screen;

pub use led_wire::{Command, LedEvent, LedState, Notice, ScreenSnapshot, ScreenView};
