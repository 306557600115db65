// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! trak - a MIDI tracker step sequencer.
//!
//! The engine is split into a read-only [`studio`] catalog, a mutable
//! [`project`] model and a [`sequencer`] that stages every change of a tick
//! in an update buffer and commits it at once. The terminal front end in
//! `main.rs` drives it from the keyboard, MIDI input and a row clock.

pub mod arrangement;
pub mod config;
pub mod control;
pub mod error;
pub mod index;
pub mod midi;
pub mod persist;
pub mod project;
pub mod sequencer;
pub mod studio;
pub mod timing;
pub mod ui;

pub use error::EngineError;
