//! Injected collaborators.
//!
//! The orchestrator does not render, redirect or manage history itself.
//! Those concerns live in collaborators handed to the builder, each in a
//! named slot, and attached as soon as the orchestrator is built so they can
//! subscribe to its events.

use crate::extension::Extension;
use std::fmt;
use std::sync::Arc;

/// Named collaborator slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollaboratorSlot {
    /// Applies UI state (loading indicators, disabled controls)
    Ui,
    /// Follows `redirect` payloads
    Redirect,
    /// Applies `snippets` payloads
    Snippets,
    /// Validates and serializes forms
    Forms,
    /// Records navigation history
    History,
    /// Loads and runs scripts found in snippets
    Scripts,
}

impl CollaboratorSlot {
    /// All slots in attach order
    pub const ALL: [Self; 6] = [
        Self::Ui,
        Self::Redirect,
        Self::Snippets,
        Self::Forms,
        Self::History,
        Self::Scripts,
    ];

    /// Slot name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ui => "ui",
            Self::Redirect => "redirect",
            Self::Snippets => "snippets",
            Self::Forms => "forms",
            Self::History => "history",
            Self::Scripts => "scripts",
        }
    }
}

impl fmt::Display for CollaboratorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collaborators by slot. Empty slots are simply skipped.
#[derive(Clone, Default)]
pub struct Collaborators {
    ui: Option<Arc<dyn Extension>>,
    redirect: Option<Arc<dyn Extension>>,
    snippets: Option<Arc<dyn Extension>>,
    forms: Option<Arc<dyn Extension>>,
    history: Option<Arc<dyn Extension>>,
    scripts: Option<Arc<dyn Extension>>,
}

impl Collaborators {
    /// No collaborators
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill `slot`, replacing whatever it held
    #[must_use]
    pub fn with(mut self, slot: CollaboratorSlot, collaborator: Arc<dyn Extension>) -> Self {
        *self.slot_mut(slot) = Some(collaborator);
        self
    }

    /// The collaborator in `slot`
    #[must_use]
    pub fn get(&self, slot: CollaboratorSlot) -> Option<&Arc<dyn Extension>> {
        match slot {
            CollaboratorSlot::Ui => self.ui.as_ref(),
            CollaboratorSlot::Redirect => self.redirect.as_ref(),
            CollaboratorSlot::Snippets => self.snippets.as_ref(),
            CollaboratorSlot::Forms => self.forms.as_ref(),
            CollaboratorSlot::History => self.history.as_ref(),
            CollaboratorSlot::Scripts => self.scripts.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: CollaboratorSlot) -> &mut Option<Arc<dyn Extension>> {
        match slot {
            CollaboratorSlot::Ui => &mut self.ui,
            CollaboratorSlot::Redirect => &mut self.redirect,
            CollaboratorSlot::Snippets => &mut self.snippets,
            CollaboratorSlot::Forms => &mut self.forms,
            CollaboratorSlot::History => &mut self.history,
            CollaboratorSlot::Scripts => &mut self.scripts,
        }
    }

    /// Filled slots in attach order
    pub fn iter(&self) -> impl Iterator<Item = (CollaboratorSlot, &Arc<dyn Extension>)> {
        CollaboratorSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|collaborator| (slot, collaborator)))
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(slot, _)| slot.as_str()))
            .finish()
    }
}
