//! Trader actions and market data batches
//!
//! This module defines the categorical events the pipeline transports:
//! - `TraderAction`, a closed set of three labels
//! - `MarketData`, an ordered batch of actions produced together

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of distinct trader actions
pub const ACTION_COUNT: usize = 3;

/// A single trader decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TraderAction {
    /// No position change
    #[default]
    Hold = 0,
    /// Open or add to a long position
    Buy = 1,
    /// Close or reduce a position
    Sell = 2,
}

impl TraderAction {
    /// All actions, in tag order
    pub const ALL: [TraderAction; ACTION_COUNT] =
        [TraderAction::Hold, TraderAction::Buy, TraderAction::Sell];

    /// Slot of this action in a per-action count array
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TraderAction::Hold),
            1 => Some(TraderAction::Buy),
            2 => Some(TraderAction::Sell),
            _ => None,
        }
    }
}

impl TryFrom<u8> for TraderAction {
    type Error = FlowError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_u8(value).ok_or(FlowError::UnknownAction(value))
    }
}

impl From<TraderAction> for u8 {
    fn from(action: TraderAction) -> u8 {
        action as u8
    }
}

impl fmt::Display for TraderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraderAction::Hold => write!(f, "HOLD"),
            TraderAction::Buy => write!(f, "BUY"),
            TraderAction::Sell => write!(f, "SELL"),
        }
    }
}

/// An ordered batch of trader actions observed together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    actions: Vec<TraderAction>,
}

impl MarketData {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` actions
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            actions: Vec::with_capacity(capacity),
        }
    }

    /// Append an action
    pub fn add_action(&mut self, action: TraderAction) {
        self.actions.push(action);
    }

    /// Actions in the order they were added
    pub fn actions(&self) -> &[TraderAction] {
        &self.actions
    }

    /// Remove all actions
    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Number of actions in the batch
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the batch holds no actions
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Consume the batch, returning its actions
    pub fn into_actions(self) -> Vec<TraderAction> {
        self.actions
    }
}

impl From<Vec<TraderAction>> for MarketData {
    fn from(actions: Vec<TraderAction>) -> Self {
        Self { actions }
    }
}

impl FromIterator<TraderAction> for MarketData {
    fn from_iter<I: IntoIterator<Item = TraderAction>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}
