// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequencer core for stepping and editing a project.
//!
//! This module provides:
//! - Event queue filled by input adapters between ticks
//! - Column map translating the cursor into track/slot/field
//! - Update buffer staging every mutation of a tick for one commit
//! - Playback tick walking song, part, pattern and row cursors
//! - Edit tick and editor operations writing cells under the cursor

pub mod columns;
mod edit;
pub mod events;
mod playback;
pub mod update;

pub use columns::{Column, ColumnMap, FieldKind, TrackSpan};
pub use events::{EventQueue, InputEvent, Route, EVENT_QUEUE_CAPACITY};
pub use update::{
    CellWrite, Facet, InstrumentEvent, NullRenderer, OutputMessage, Renderer, Target, Update,
};

use crate::error::EngineError;
use crate::midi::Transport;
use crate::project::Project;
use crate::studio::Studio;

/// Everything a tick reads or writes, borrowed for the duration of one call
pub struct Context<'a> {
    /// Project model, mutated only by commit
    pub project: &'a mut Project,
    /// Read-only catalog
    pub studio: &'a Studio,
    /// Output sink
    pub transport: &'a mut dyn Transport,
    /// Change notifications
    pub renderer: &'a mut dyn Renderer,
}

impl<'a> Context<'a> {
    /// Bundle the tick collaborators
    pub fn new(
        project: &'a mut Project,
        studio: &'a Studio,
        transport: &'a mut dyn Transport,
        renderer: &'a mut dyn Renderer,
    ) -> Self {
        Self {
            project,
            studio,
            transport,
            renderer,
        }
    }
}

/// Sequencer behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerOptions {
    /// Forward drained input events to the output
    pub thru: bool,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self { thru: true }
    }
}

/// Drives playback and editing of one project
#[derive(Debug, Clone)]
pub struct StepSequencer {
    columns: ColumnMap,
    options: SequencerOptions,
}

impl StepSequencer {
    /// Create a sequencer for a project's current pattern
    pub fn new(project: &Project, studio: &Studio) -> Result<Self, EngineError> {
        Ok(Self {
            columns: ColumnMap::build(project, studio)?,
            options: SequencerOptions::default(),
        })
    }

    /// Builder: set options
    pub fn with_options(mut self, options: SequencerOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    pub fn options(&self) -> SequencerOptions {
        self.options
    }

    /// Column map of the pattern under the cursor
    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Column under the cursor
    pub fn current_column(&self, project: &Project) -> Result<&Column, EngineError> {
        self.columns.lookup(project.column_idx())
    }

    /// Apply a staged update and keep the column map in step with it
    pub fn commit(&mut self, update: Update, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let facets = update.commit(
            &mut *ctx.project,
            ctx.studio,
            &mut *ctx.transport,
            &mut *ctx.renderer,
        )?;
        if facets.iter().any(|f| f.affects_columns()) {
            self.columns = ColumnMap::build(ctx.project, ctx.studio)?;
        }
        Ok(facets)
    }
}
